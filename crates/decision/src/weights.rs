//! Objective weights — the probability distribution steering the engine.

use serde::{Deserialize, Serialize};

use cs_domain::config::DecisionConfig;

/// One of the three conversation objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    NeedSatisfaction,
    ObjectionHandling,
    ConversionProgress,
}

/// Weights over the objectives. Always renormalized to sum to 1 before
/// scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub need_satisfaction: f64,
    pub objection_handling: f64,
    pub conversion_progress: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            need_satisfaction: 0.35,
            objection_handling: 0.25,
            conversion_progress: 0.40,
        }
    }
}

impl ObjectiveWeights {
    pub fn from_config(config: &DecisionConfig) -> Self {
        Self {
            need_satisfaction: config.need_satisfaction_weight,
            objection_handling: config.objection_handling_weight,
            conversion_progress: config.conversion_progress_weight,
        }
        .normalized()
    }

    pub fn get(&self, objective: Objective) -> f64 {
        match objective {
            Objective::NeedSatisfaction => self.need_satisfaction,
            Objective::ObjectionHandling => self.objection_handling,
            Objective::ConversionProgress => self.conversion_progress,
        }
    }

    /// Raise one weight by `delta` (capped at 1.0), then renormalize.
    pub fn bump(mut self, objective: Objective, delta: f64) -> Self {
        let slot = match objective {
            Objective::NeedSatisfaction => &mut self.need_satisfaction,
            Objective::ObjectionHandling => &mut self.objection_handling,
            Objective::ConversionProgress => &mut self.conversion_progress,
        };
        *slot = (*slot + delta).min(1.0);
        self.normalized()
    }

    /// Scale so the three weights sum to 1. A degenerate all-zero input
    /// falls back to the defaults.
    pub fn normalized(self) -> Self {
        let sum = self.need_satisfaction + self.objection_handling + self.conversion_progress;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            need_satisfaction: self.need_satisfaction / sum,
            objection_handling: self.objection_handling / sum,
            conversion_progress: self.conversion_progress / sum,
        }
    }

    pub fn sum(&self) -> f64 {
        self.need_satisfaction + self.objection_handling + self.conversion_progress
    }
}
