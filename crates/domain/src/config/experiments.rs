use serde::{Deserialize, Serialize};

/// A/B experiment framework tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentsConfig {
    /// UCB1 exploration factor `c`.
    #[serde(default = "d_exploration_factor")]
    pub exploration_factor: f64,

    /// Winners deploy automatically at or above this confidence.
    #[serde(default = "d_auto_deploy_threshold")]
    pub auto_deploy_threshold: f64,

    /// Experiments never complete before running this long.
    #[serde(default = "d_min_duration_hours")]
    pub minimum_experiment_duration_hours: u64,

    /// Cap on concurrently running experiments.
    #[serde(default = "d_max_concurrent")]
    pub max_concurrent_experiments: usize,

    /// Default minimum sample size for new experiments.
    #[serde(default = "d_min_sample")]
    pub default_minimum_sample: u64,

    /// Default statistical confidence level for new experiments.
    #[serde(default = "d_confidence_level")]
    pub default_confidence_level: f64,

    /// The best arm must beat the runner-up mean by at least this margin.
    #[serde(default = "d_winner_margin")]
    pub winner_margin: f64,

    /// Target duration (seconds) for the `time_to_close` reward curve.
    #[serde(default = "d_optimal_close_secs")]
    pub optimal_close_secs: u64,
}

impl Default for ExperimentsConfig {
    fn default() -> Self {
        Self {
            exploration_factor: d_exploration_factor(),
            auto_deploy_threshold: d_auto_deploy_threshold(),
            minimum_experiment_duration_hours: d_min_duration_hours(),
            max_concurrent_experiments: d_max_concurrent(),
            default_minimum_sample: d_min_sample(),
            default_confidence_level: d_confidence_level(),
            winner_margin: d_winner_margin(),
            optimal_close_secs: d_optimal_close_secs(),
        }
    }
}

fn d_exploration_factor() -> f64 {
    2.0
}
fn d_auto_deploy_threshold() -> f64 {
    0.8
}
fn d_min_duration_hours() -> u64 {
    24
}
fn d_max_concurrent() -> usize {
    3
}
fn d_min_sample() -> u64 {
    100
}
fn d_confidence_level() -> f64 {
    0.8
}
fn d_winner_margin() -> f64 {
    0.05
}
fn d_optimal_close_secs() -> u64 {
    420
}
