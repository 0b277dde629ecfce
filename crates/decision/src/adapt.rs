//! Real-time strategy adaptation from turn feedback.

use serde::{Deserialize, Serialize};

use cs_analyzers::results::TurnAnalysis;

use crate::engine::{Decision, DecisionEngine};
use crate::tree::ActionCategory;
use crate::weights::Objective;

/// Why a prior strategy underperformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    ObjectionNotAddressed,
    NeedNotSatisfied,
    ConversionStalled,
    Other,
}

impl FeedbackKind {
    fn objective(self) -> Option<Objective> {
        match self {
            FeedbackKind::ObjectionNotAddressed => Some(Objective::ObjectionHandling),
            FeedbackKind::NeedNotSatisfied => Some(Objective::NeedSatisfaction),
            FeedbackKind::ConversionStalled => Some(Objective::ConversionProgress),
            FeedbackKind::Other => None,
        }
    }
}

/// Feedback about how the prior strategy played out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyFeedback {
    pub success: bool,
    pub kind: FeedbackKind,
    #[serde(default)]
    pub details: Option<String>,
}

/// Weight bump applied when feedback names a failing objective.
const FAILURE_BUMP: f64 = 0.15;

impl DecisionEngine {
    /// Adapt a prior strategy given fresh analysis and optional feedback.
    ///
    /// Unsuccessful feedback bumps the weight correlated with the failure
    /// and re-plans; a prior whose actions scored below the adaptation
    /// threshold re-plans as well. Otherwise the prior stands.
    pub fn adapt(
        &self,
        analysis: &TurnAnalysis,
        prior: &Decision,
        feedback: Option<&StrategyFeedback>,
    ) -> Decision {
        let mut weights = prior.objectives_used;
        let mut adaptation_needed = false;

        if let Some(feedback) = feedback {
            if !feedback.success {
                adaptation_needed = true;
                if let Some(objective) = feedback.kind.objective() {
                    weights = weights.bump(objective, FAILURE_BUMP);
                }
            }
        }

        if !prior.actions.is_empty() {
            let mean_score =
                prior.actions.iter().map(|a| a.score).sum::<f64>() / prior.actions.len() as f64;
            if mean_score < self.config().adaptation_threshold {
                adaptation_needed = true;
            }
        }

        if !adaptation_needed {
            return prior.clone();
        }

        let mut decision = self.evaluate(analysis, Some(weights));

        // Boost exploration so re-planning actually tries new directions.
        let exploration_rate = self.config().exploration_rate;
        for action in &mut decision.actions {
            if action.category == ActionCategory::Exploration {
                action.score = (action.score + exploration_rate).min(1.0);
            }
        }
        decision
            .actions
            .sort_by(|a, b| b.score.total_cmp(&a.score));
        decision.confidence = if decision.actions.is_empty() {
            0.0
        } else {
            decision.actions.iter().map(|a| a.score).sum::<f64>() / decision.actions.len() as f64
        };
        decision.adapted = true;
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_domain::config::DecisionConfig;

    fn engine() -> DecisionEngine {
        DecisionEngine::new(DecisionConfig::default())
    }

    #[test]
    fn successful_feedback_keeps_the_prior() {
        let engine = engine();
        let analysis = TurnAnalysis::neutral();
        let mut prior = engine.evaluate(&analysis, None);
        // Pretend the prior scored comfortably.
        for action in &mut prior.actions {
            action.score = 0.8;
        }
        let feedback = StrategyFeedback {
            success: true,
            kind: FeedbackKind::Other,
            details: None,
        };
        let adapted = engine.adapt(&analysis, &prior, Some(&feedback));
        assert!(!adapted.adapted);
        assert_eq!(adapted.actions, prior.actions);
    }

    #[test]
    fn failure_feedback_bumps_the_matching_objective() {
        let engine = engine();
        let analysis = TurnAnalysis::neutral();
        let prior = engine.evaluate(&analysis, None);
        let feedback = StrategyFeedback {
            success: false,
            kind: FeedbackKind::ObjectionNotAddressed,
            details: Some("price pushback ignored".into()),
        };
        let adapted = engine.adapt(&analysis, &prior, Some(&feedback));
        assert!(adapted.adapted);
        assert!(
            adapted.objectives_used.objection_handling > prior.objectives_used.objection_handling
        );
        assert!((adapted.objectives_used.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weak_prior_triggers_replanning_without_feedback() {
        let engine = engine();
        let analysis = TurnAnalysis::neutral();
        let mut prior = engine.evaluate(&analysis, None);
        for action in &mut prior.actions {
            action.score = 0.1;
        }
        let adapted = engine.adapt(&analysis, &prior, None);
        assert!(adapted.adapted);
    }

    #[test]
    fn adapted_actions_remain_sorted() {
        let engine = engine();
        let analysis = TurnAnalysis::neutral();
        let prior = engine.evaluate(&analysis, None);
        let feedback = StrategyFeedback {
            success: false,
            kind: FeedbackKind::ConversionStalled,
            details: None,
        };
        let adapted = engine.adapt(&analysis, &prior, Some(&feedback));
        for pair in adapted.actions.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
