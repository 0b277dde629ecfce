//! Conversation state — the aggregate the orchestrator owns.
//!
//! `ConversationState` is mutated exclusively by the orchestrator (one
//! writer per conversation, enforced by the per-conversation run lock).
//! Analyzers and the decision engine only ever see read-only snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::customer::CustomerData;
use crate::error::{Error, Result};
use crate::tier::TierLevel;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Program & phase
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The business offering assigned to a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgramType {
    Prime,
    Longevity,
    Hybrid,
}

impl std::fmt::Display for ProgramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prime => write!(f, "PRIME"),
            Self::Longevity => write!(f, "LONGEVITY"),
            Self::Hybrid => write!(f, "HYBRID"),
        }
    }
}

/// Conversation phase.
///
/// Transitions are restricted to the lifecycle DAG:
///
/// ```text
/// greeting → exploration → presentation ⇄ objection_handling → closing
///                                                   closing → completed | follow_up
/// any non-terminal → human_transfer | ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Greeting,
    Exploration,
    Presentation,
    ObjectionHandling,
    Closing,
    FollowUp,
    Completed,
    Ended,
    HumanTransfer,
}

impl Phase {
    /// Terminal phases accept no further messages or transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Ended | Phase::HumanTransfer)
    }

    /// Whether `self → next` is an edge of the lifecycle DAG.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;
        if self.is_terminal() {
            return false;
        }
        // Every non-terminal phase may end or hand off to a human.
        if matches!(next, Ended | HumanTransfer) {
            return true;
        }
        matches!(
            (self, next),
            (Greeting, Exploration)
                | (Exploration, Presentation)
                | (Presentation, ObjectionHandling)
                | (ObjectionHandling, Presentation)
                | (Presentation, Closing)
                | (ObjectionHandling, Closing)
                | (Closing, Completed)
                | (Closing, FollowUp)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Greeting => "greeting",
            Phase::Exploration => "exploration",
            Phase::Presentation => "presentation",
            Phase::ObjectionHandling => "objection_handling",
            Phase::Closing => "closing",
            Phase::FollowUp => "follow_up",
            Phase::Completed => "completed",
            Phase::Ended => "ended",
            Phase::HumanTransfer => "human_transfer",
        };
        write!(f, "{s}")
    }
}

/// Why a conversation reached a terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Timeout,
    RejectionDetected,
    IntentAchieved,
    Completed,
    Transferred,
    EndedNaturally,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EndReason::Timeout => "timeout",
            EndReason::RejectionDetected => "rejection_detected",
            EndReason::IntentAchieved => "intent_achieved",
            EndReason::Completed => "completed",
            EndReason::Transferred => "transferred",
            EndReason::EndedNaturally => "ended_naturally",
        };
        write!(f, "{s}")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A recorded mid-conversation program switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSwitch {
    pub at: DateTime<Utc>,
    pub from: ProgramType,
    pub to: ProgramType,
    pub confidence: f64,
    pub reasoning: String,
    /// First 100 chars of the user message that triggered the switch.
    pub trigger_excerpt: String,
}

/// One step of tier detection over the life of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierEvent {
    pub tier: TierLevel,
    pub confidence: f64,
    pub at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// State of one conversation between the agent and a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: Uuid,
    pub customer_id: String,
    pub customer: CustomerData,
    pub program_type: ProgramType,
    pub phase: Phase,
    pub messages: Vec<Message>,
    pub session_start: DateTime<Utc>,
    pub max_duration_secs: u64,
    pub intent_timeout_secs: u64,
    #[serde(default)]
    pub insights: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub objections_raised: Vec<String>,
    #[serde(default)]
    pub program_switches: Vec<ProgramSwitch>,
    #[serde(default)]
    pub tier_progression: Vec<TierEvent>,
    #[serde(default)]
    pub experiment_assignments: Vec<Uuid>,
    #[serde(default)]
    pub next_steps_agreed: bool,
    #[serde(default)]
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(
        customer: CustomerData,
        program_type: ProgramType,
        max_duration_secs: u64,
        intent_timeout_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id: customer.id.clone(),
            customer,
            program_type,
            phase: Phase::Greeting,
            messages: Vec::new(),
            session_start: now,
            max_duration_secs,
            intent_timeout_secs,
            insights: HashMap::new(),
            objections_raised: Vec::new(),
            program_switches: Vec::new(),
            tier_progression: Vec::new(),
            experiment_assignments: Vec::new(),
            next_steps_agreed: false,
            end_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Append a message. Rejected once the conversation is terminal
    /// (messages are append-only and closed conversations are frozen).
    pub fn push_message(&mut self, role: Role, content: impl Into<String>) -> Result<&Message> {
        if matches!(self.phase, Phase::Completed | Phase::Ended) {
            return Err(Error::ClosedConversation(self.id));
        }
        self.messages.push(Message::new(role, content));
        self.touch();
        Ok(self.messages.last().expect("just pushed"))
    }

    /// Transition to `next`, enforcing the lifecycle DAG.
    pub fn transition(&mut self, next: Phase) -> Result<()> {
        if self.phase == next {
            return Ok(());
        }
        if !self.phase.can_transition_to(next) {
            return Err(Error::Invariant(format!(
                "illegal phase transition {} -> {} in conversation {}",
                self.phase, next, self.id
            )));
        }
        self.phase = next;
        self.touch();
        Ok(())
    }

    /// Record an objection type once.
    pub fn add_objection(&mut self, objection: impl Into<String>) {
        let objection = objection.into();
        if !self.objections_raised.contains(&objection) {
            self.objections_raised.push(objection);
            self.touch();
        }
    }

    /// Record a program switch and apply it.
    pub fn record_switch(&mut self, switch: ProgramSwitch) {
        self.program_type = switch.to;
        self.program_switches.push(switch);
        self.touch();
    }

    /// Record a tier progression step.
    pub fn record_tier(&mut self, event: TierEvent) {
        self.tier_progression.push(event);
        self.touch();
    }

    /// Register an experiment assignment (set semantics).
    pub fn register_assignment(&mut self, experiment_id: Uuid) {
        if !self.experiment_assignments.contains(&experiment_id) {
            self.experiment_assignments.push(experiment_id);
            self.touch();
        }
    }

    pub fn set_insight(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.insights.insert(key.into(), value);
        self.touch();
    }

    /// Last tier recorded in the progression, if any.
    pub fn current_tier(&self) -> Option<TierLevel> {
        self.tier_progression.last().map(|e| e.tier)
    }

    /// The most recent assistant message.
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// The `n` most recent messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Content of the `n` most recent user messages, oldest first.
    pub fn recent_user_texts(&self, n: usize) -> Vec<&str> {
        let mut texts: Vec<&str> = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .take(n)
            .map(|m| m.content.as_str())
            .collect();
        texts.reverse();
        texts
    }

    /// Seconds elapsed since the session started.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.session_start)
            .num_seconds()
            .max(0) as u64
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerData {
        CustomerData::new("c1", "Ana", "ana@example.com", 34).unwrap()
    }

    fn state() -> ConversationState {
        ConversationState::new(customer(), ProgramType::Prime, 1800, 180)
    }

    #[test]
    fn messages_are_append_only_and_timestamped_in_order() {
        let mut s = state();
        s.push_message(Role::Assistant, "hola").unwrap();
        s.push_message(Role::User, "hola, cuéntame más").unwrap();
        assert_eq!(s.messages.len(), 2);
        assert!(s.messages[0].timestamp <= s.messages[1].timestamp);
    }

    #[test]
    fn closed_conversation_rejects_messages() {
        let mut s = state();
        s.transition(Phase::Ended).unwrap();
        let err = s.push_message(Role::User, "sigo aquí").unwrap_err();
        assert!(matches!(err, Error::ClosedConversation(_)));
    }

    #[test]
    fn transitions_follow_the_dag() {
        let mut s = state();
        s.transition(Phase::Exploration).unwrap();
        s.transition(Phase::Presentation).unwrap();
        s.transition(Phase::ObjectionHandling).unwrap();
        s.transition(Phase::Presentation).unwrap();
        s.transition(Phase::Closing).unwrap();
        s.transition(Phase::Completed).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn illegal_transition_is_an_invariant_violation() {
        let mut s = state();
        let err = s.transition(Phase::Closing).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
        // State is not corrupted.
        assert_eq!(s.phase, Phase::Greeting);
    }

    #[test]
    fn terminal_phases_never_leave() {
        let mut s = state();
        s.transition(Phase::Ended).unwrap();
        assert!(s.transition(Phase::Exploration).is_err());
        assert!(s.transition(Phase::HumanTransfer).is_err());
    }

    #[test]
    fn any_non_terminal_phase_may_transfer_or_end() {
        for phase in [
            Phase::Greeting,
            Phase::Exploration,
            Phase::Presentation,
            Phase::ObjectionHandling,
            Phase::Closing,
            Phase::FollowUp,
        ] {
            assert!(phase.can_transition_to(Phase::Ended), "{phase} -> ended");
            assert!(
                phase.can_transition_to(Phase::HumanTransfer),
                "{phase} -> human_transfer"
            );
        }
    }

    #[test]
    fn objections_and_assignments_deduplicate() {
        let mut s = state();
        s.add_objection("price");
        s.add_objection("price");
        assert_eq!(s.objections_raised, vec!["price".to_string()]);

        let exp = Uuid::new_v4();
        s.register_assignment(exp);
        s.register_assignment(exp);
        assert_eq!(s.experiment_assignments.len(), 1);
    }

    #[test]
    fn recent_user_texts_keeps_order() {
        let mut s = state();
        s.push_message(Role::User, "uno").unwrap();
        s.push_message(Role::Assistant, "respuesta").unwrap();
        s.push_message(Role::User, "dos").unwrap();
        assert_eq!(s.recent_user_texts(2), vec!["uno", "dos"]);
    }
}
