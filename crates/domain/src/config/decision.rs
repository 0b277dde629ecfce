use serde::{Deserialize, Serialize};

/// Decision engine tunables.
///
/// The three objective weights are renormalized to sum to 1 before use, so
/// they can be tuned independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    #[serde(default = "d_need_weight")]
    pub need_satisfaction_weight: f64,
    #[serde(default = "d_objection_weight")]
    pub objection_handling_weight: f64,
    #[serde(default = "d_conversion_weight")]
    pub conversion_progress_weight: f64,

    /// Overall confidence below which an exploration action is injected.
    #[serde(default = "d_min_confidence")]
    pub min_confidence: f64,

    /// Score boost applied to exploration actions during adaptation.
    #[serde(default = "d_exploration_rate")]
    pub exploration_rate: f64,

    /// Mean action score below which a strategy is re-planned.
    #[serde(default = "d_adaptation_threshold")]
    pub adaptation_threshold: f64,

    /// Maximum decision tree depth.
    #[serde(default = "d_max_tree_depth")]
    pub max_tree_depth: usize,

    /// Number of trailing messages considered for predictions.
    #[serde(default = "d_context_window")]
    pub context_window: usize,

    /// Conversion category thresholds: `low < t0 ≤ medium < t1 ≤ high < t2`.
    #[serde(default = "d_conversion_thresholds")]
    pub conversion_thresholds: [f64; 3],
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            need_satisfaction_weight: d_need_weight(),
            objection_handling_weight: d_objection_weight(),
            conversion_progress_weight: d_conversion_weight(),
            min_confidence: d_min_confidence(),
            exploration_rate: d_exploration_rate(),
            adaptation_threshold: d_adaptation_threshold(),
            max_tree_depth: d_max_tree_depth(),
            context_window: d_context_window(),
            conversion_thresholds: d_conversion_thresholds(),
        }
    }
}

fn d_need_weight() -> f64 {
    0.35
}
fn d_objection_weight() -> f64 {
    0.25
}
fn d_conversion_weight() -> f64 {
    0.40
}
fn d_min_confidence() -> f64 {
    0.6
}
fn d_exploration_rate() -> f64 {
    0.2
}
fn d_adaptation_threshold() -> f64 {
    0.3
}
fn d_max_tree_depth() -> usize {
    5
}
fn d_context_window() -> usize {
    15
}
fn d_conversion_thresholds() -> [f64; 3] {
    [0.3, 0.6, 0.8]
}
