use serde::{Deserialize, Serialize};

/// Coarse feature flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "d_true")]
    pub voice_synthesis: bool,
    #[serde(default = "d_true")]
    pub ml_optimization: bool,
    #[serde(default = "d_true")]
    pub ab_testing: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            voice_synthesis: true,
            ml_optimization: true,
            ab_testing: true,
        }
    }
}

fn d_true() -> bool {
    true
}
