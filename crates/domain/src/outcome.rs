//! Terminal conversation outcomes and the metrics accumulated along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tier::TierLevel;

/// How a conversation ended, as reported to learning and experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationOutcome {
    Converted,
    Lost,
    Transferred,
    TimedOut,
    EndedNaturally,
}

impl std::fmt::Display for ConversationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversationOutcome::Converted => "converted",
            ConversationOutcome::Lost => "lost",
            ConversationOutcome::Transferred => "transferred",
            ConversationOutcome::TimedOut => "timed_out",
            ConversationOutcome::EndedNaturally => "ended_naturally",
        };
        write!(f, "{s}")
    }
}

/// Aggregated per-conversation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationMetrics {
    /// Engagement score in `[0, 10]`.
    pub engagement_score: f64,
    pub user_messages: u32,
    pub assistant_messages: u32,
    pub total_duration_secs: u64,
    /// Mean user response time, when at least one sample was observed.
    #[serde(default)]
    pub avg_response_ms: Option<u64>,
    /// Satisfaction signal in `[0, 10]`, when reported.
    #[serde(default)]
    pub satisfaction_score: Option<f64>,
}

/// The terminal summary of a conversation.
///
/// Written at most once per conversation (idempotent by `conversation_id`)
/// and joined against experiment assignments to compute bandit rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub conversation_id: Uuid,
    pub outcome: ConversationOutcome,
    #[serde(default)]
    pub tier_recommended: Option<TierLevel>,
    #[serde(default)]
    pub tier_accepted: Option<TierLevel>,
    #[serde(default)]
    pub satisfaction: Option<f64>,
    pub metrics: ConversationMetrics,
    #[serde(default)]
    pub experiment_assignments: Vec<Uuid>,
    pub recorded_at: DateTime<Utc>,
}
