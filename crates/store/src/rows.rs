//! Persisted row layout and codecs.
//!
//! One row per conversation keyed by `conversation_id`, with messages and
//! profile blobs as nested JSON and timestamps as ISO-8601 strings.
//! Experiments and outcomes live in their own tables keyed by
//! `experiment_id` / `conversation_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use cs_domain::conversation::{
    ConversationState, EndReason, Message, Phase, ProgramSwitch, ProgramType, TierEvent,
};
use cs_domain::customer::CustomerData;
use cs_domain::error::Result;

use crate::provider::Row;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const CONVERSATIONS: &str = "conversations";
pub const EXPERIMENTS: &str = "ml_experiments";
pub const OUTCOMES: &str = "conversation_outcomes";
pub const PREDICTIONS: &str = "model_predictions";

/// Primary-key column per table (used for cache keys and upsert identity).
pub fn primary_key_for(table: &str) -> &'static str {
    match table {
        CONVERSATIONS => "conversation_id",
        EXPERIMENTS => "experiment_id",
        OUTCOMES => "conversation_id",
        _ => "id",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation row codec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The wire shape of one `conversations` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRow {
    pub conversation_id: Uuid,
    pub customer_id: String,
    pub customer_data: CustomerData,
    pub program_type: ProgramType,
    pub phase: Phase,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub session_insights: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub objections_raised: Vec<String>,
    #[serde(default)]
    pub program_switches: Vec<ProgramSwitch>,
    #[serde(default)]
    pub tier_progression: Vec<TierEvent>,
    #[serde(default)]
    pub experiment_assignments: Vec<Uuid>,
    pub session_start: DateTime<Utc>,
    pub max_duration_seconds: u64,
    pub intent_timeout_seconds: u64,
    #[serde(default)]
    pub next_steps_agreed: bool,
    #[serde(default)]
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ConversationState> for ConversationRow {
    fn from(state: &ConversationState) -> Self {
        Self {
            conversation_id: state.id,
            customer_id: state.customer_id.clone(),
            customer_data: state.customer.clone(),
            program_type: state.program_type,
            phase: state.phase,
            messages: state.messages.clone(),
            session_insights: state.insights.clone(),
            objections_raised: state.objections_raised.clone(),
            program_switches: state.program_switches.clone(),
            tier_progression: state.tier_progression.clone(),
            experiment_assignments: state.experiment_assignments.clone(),
            session_start: state.session_start,
            max_duration_seconds: state.max_duration_secs,
            intent_timeout_seconds: state.intent_timeout_secs,
            next_steps_agreed: state.next_steps_agreed,
            end_reason: state.end_reason,
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

impl From<ConversationRow> for ConversationState {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.conversation_id,
            customer_id: row.customer_id,
            customer: row.customer_data,
            program_type: row.program_type,
            phase: row.phase,
            messages: row.messages,
            session_start: row.session_start,
            max_duration_secs: row.max_duration_seconds,
            intent_timeout_secs: row.intent_timeout_seconds,
            insights: row.session_insights,
            objections_raised: row.objections_raised,
            program_switches: row.program_switches,
            tier_progression: row.tier_progression,
            experiment_assignments: row.experiment_assignments,
            next_steps_agreed: row.next_steps_agreed,
            end_reason: row.end_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub fn conversation_to_row(state: &ConversationState) -> Result<Row> {
    Ok(serde_json::to_value(ConversationRow::from(state))?)
}

pub fn row_to_conversation(row: Row) -> Result<ConversationState> {
    let parsed: ConversationRow = serde_json::from_value(row)?;
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_domain::conversation::Role;

    #[test]
    fn conversation_roundtrips_through_its_row() {
        let customer = CustomerData::new("cust-1", "Ana", "ana@example.com", 34).unwrap();
        let mut state = ConversationState::new(customer, ProgramType::Prime, 1800, 180);
        state.push_message(Role::Assistant, "hola Ana").unwrap();
        state.push_message(Role::User, "hola").unwrap();
        state.add_objection("price");
        state.set_insight("engagement", serde_json::json!(0.7));

        let row = conversation_to_row(&state).unwrap();
        assert_eq!(row["conversation_id"], serde_json::json!(state.id));
        // Timestamps serialize as ISO-8601 strings.
        assert!(row["created_at"].is_string());

        let restored = row_to_conversation(row).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn primary_keys_per_table() {
        assert_eq!(primary_key_for(CONVERSATIONS), "conversation_id");
        assert_eq!(primary_key_for(EXPERIMENTS), "experiment_id");
        assert_eq!(primary_key_for(OUTCOMES), "conversation_id");
        assert_eq!(primary_key_for("anything_else"), "id");
    }
}
