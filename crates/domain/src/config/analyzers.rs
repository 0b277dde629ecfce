use serde::{Deserialize, Serialize};

/// Tunables for the per-turn analyzer fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzersConfig {
    /// Per-analyzer deadline. On expiry the neutral default is substituted.
    #[serde(default = "d_deadline_ms")]
    pub deadline_ms: u64,

    /// Objections predicted above this confidence are remembered on the
    /// conversation state.
    #[serde(default = "d_objection_memory_threshold")]
    pub objection_memory_threshold: f64,

    /// Tier detections above this confidence extend the tier progression.
    #[serde(default = "d_tier_confidence_floor")]
    pub tier_confidence_floor: f64,
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            deadline_ms: d_deadline_ms(),
            objection_memory_threshold: d_objection_memory_threshold(),
            tier_confidence_floor: d_tier_confidence_floor(),
        }
    }
}

fn d_deadline_ms() -> u64 {
    500
}
fn d_objection_memory_threshold() -> f64 {
    0.7
}
fn d_tier_confidence_floor() -> f64 {
    0.6
}
