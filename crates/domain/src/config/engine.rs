use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator / lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conversation lifecycle limits and orchestrator tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on conversation duration (minutes). Platform contexts may
    /// set a lower per-session value, never a higher one.
    #[serde(default = "d_max_duration_minutes")]
    pub max_conversation_duration_minutes: u64,

    /// Hard cap on message count per conversation.
    #[serde(default = "d_max_messages")]
    pub max_messages_per_conversation: usize,

    /// Minimum elapsed time between two successful starts for the same
    /// customer. `0` disables the cooldown.
    #[serde(default = "d_cooldown_hours")]
    pub cooldown_hours: u64,

    /// Seconds allowed for intent detection before a timeout close.
    #[serde(default = "d_intent_timeout_secs")]
    pub intent_timeout_secs: u64,

    /// Number of trailing messages handed to the agent per turn.
    #[serde(default = "d_history_window")]
    pub history_window: usize,

    /// Forced profile analysis fires while elapsed time is below this bound…
    #[serde(default = "d_forced_analysis_max_elapsed_secs")]
    pub forced_analysis_max_elapsed_secs: u64,

    /// …and detection confidence is below this floor.
    #[serde(default = "d_forced_analysis_confidence_floor")]
    pub forced_analysis_confidence_floor: f64,

    /// Router confidence required to switch program mid-conversation.
    #[serde(default = "d_switch_confidence")]
    pub switch_confidence_threshold: f64,

    /// Program switches are only evaluated once this many messages exist.
    #[serde(default = "d_switch_min_messages")]
    pub switch_min_messages: usize,

    /// Intent-analyzer rejection confidence that closes the conversation.
    #[serde(default = "d_rejection_confidence")]
    pub rejection_confidence_threshold: f64,

    /// How often the scheduler sweeps for timed-out conversations.
    #[serde(default = "d_sweep_interval_secs")]
    pub timeout_sweep_interval_secs: u64,

    /// Fraction of conversations enrolled in active experiments.
    #[serde(default = "d_sample_rate")]
    pub experiment_sample_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conversation_duration_minutes: d_max_duration_minutes(),
            max_messages_per_conversation: d_max_messages(),
            cooldown_hours: d_cooldown_hours(),
            intent_timeout_secs: d_intent_timeout_secs(),
            history_window: d_history_window(),
            forced_analysis_max_elapsed_secs: d_forced_analysis_max_elapsed_secs(),
            forced_analysis_confidence_floor: d_forced_analysis_confidence_floor(),
            switch_confidence_threshold: d_switch_confidence(),
            switch_min_messages: d_switch_min_messages(),
            rejection_confidence_threshold: d_rejection_confidence(),
            timeout_sweep_interval_secs: d_sweep_interval_secs(),
            experiment_sample_rate: d_sample_rate(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_duration_minutes() -> u64 {
    30
}
fn d_max_messages() -> usize {
    100
}
fn d_cooldown_hours() -> u64 {
    48
}
fn d_intent_timeout_secs() -> u64 {
    180
}
fn d_history_window() -> usize {
    5
}
fn d_forced_analysis_max_elapsed_secs() -> u64 {
    60
}
fn d_forced_analysis_confidence_floor() -> f64 {
    0.6
}
fn d_switch_confidence() -> f64 {
    0.7
}
fn d_switch_min_messages() -> usize {
    4
}
fn d_rejection_confidence() -> f64 {
    0.6
}
fn d_sweep_interval_secs() -> u64 {
    15
}
fn d_sample_rate() -> f64 {
    0.1
}
