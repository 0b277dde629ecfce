//! Read-only view of a conversation handed to analyzers.

use uuid::Uuid;

use cs_domain::conversation::{ConversationState, Phase, ProgramType, Role};

/// Everything an analyzer may look at for one turn.
///
/// Captured once per turn from the live state; analyzers never see the
/// mutable aggregate.
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    pub conversation_id: Uuid,
    pub program_type: ProgramType,
    pub phase: Phase,
    pub customer_age: u32,
    pub customer_interests: Vec<String>,
    pub customer_occupation: Option<String>,
    /// Recent messages (role + content), oldest first.
    pub messages: Vec<(Role, String)>,
    /// The user message that triggered this turn.
    pub latest_user_text: String,
    pub elapsed_secs: u64,
}

impl ConversationSnapshot {
    /// Capture the analyzer view from live state.
    ///
    /// `window` bounds how many trailing messages are copied.
    pub fn capture(state: &ConversationState, latest_user_text: &str, window: usize) -> Self {
        Self {
            conversation_id: state.id,
            program_type: state.program_type,
            phase: state.phase,
            customer_age: state.customer.age,
            customer_interests: state.customer.interests.clone(),
            customer_occupation: state.customer.occupation.clone(),
            messages: state
                .recent_messages(window)
                .iter()
                .map(|m| (m.role, m.content.clone()))
                .collect(),
            latest_user_text: latest_user_text.to_owned(),
            elapsed_secs: state.elapsed_secs(chrono::Utc::now()),
        }
    }

    /// Contents of user messages in the window, oldest first.
    pub fn user_texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(role, _)| *role == Role::User)
            .map(|(_, content)| content.as_str())
            .collect()
    }

    /// All user text (window + latest) joined and lowercased, for
    /// lexicon matching.
    pub fn combined_user_text(&self) -> String {
        let mut parts: Vec<&str> = self.user_texts();
        if !parts.contains(&self.latest_user_text.as_str()) {
            parts.push(&self.latest_user_text);
        }
        parts.join(" ").to_lowercase()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn user_message_count(&self) -> usize {
        self.user_texts().len()
    }
}
