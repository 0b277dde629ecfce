//! Adaptive learning consumer.
//!
//! Receives every outcome record, keeps rolling aggregates, and proposes
//! a strategy experiment through the framework when recent conversion
//! drops well below the long-run baseline. Model fitting happens outside
//! this service; this is the feedback-loop plumbing.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use cs_domain::outcome::{ConversationOutcome, OutcomeRecord};
use cs_experiments::{ExperimentFramework, ExperimentSpec, ExperimentType, TargetMetric, VariantSpec};

/// How many recent outcomes form the "recent" window.
const RECENT_WINDOW: usize = 50;

/// Minimum outcomes before any proposal is considered.
const MIN_OUTCOMES_FOR_PROPOSAL: u64 = 30;

/// Recent conversion must fall below `baseline * DROP_RATIO` to trigger.
const DROP_RATIO: f64 = 0.8;

#[derive(Debug, Default)]
struct Aggregates {
    outcomes_seen: u64,
    conversions: u64,
    engagement_sum: f64,
    recent: VecDeque<ConversationOutcome>,
    proposals_made: u64,
}

/// Point-in-time view of the learning loop.
#[derive(Debug, Clone, Serialize)]
pub struct LearningStatus {
    pub outcomes_seen: u64,
    pub conversion_rate: f64,
    pub recent_conversion_rate: f64,
    pub avg_engagement: f64,
    pub proposals_made: u64,
}

pub struct AdaptiveLearning {
    aggregates: Mutex<Aggregates>,
    experiments: Arc<ExperimentFramework>,
}

impl AdaptiveLearning {
    pub fn new(experiments: Arc<ExperimentFramework>) -> Self {
        Self {
            aggregates: Mutex::new(Aggregates::default()),
            experiments,
        }
    }

    /// Ingest one outcome record.
    pub fn consume(&self, record: &OutcomeRecord) {
        let mut agg = self.aggregates.lock();
        agg.outcomes_seen += 1;
        if record.outcome == ConversationOutcome::Converted {
            agg.conversions += 1;
        }
        agg.engagement_sum += record.metrics.engagement_score;
        agg.recent.push_back(record.outcome);
        if agg.recent.len() > RECENT_WINDOW {
            agg.recent.pop_front();
        }
    }

    /// Periodic review: propose a strategy experiment when recent
    /// conversion trails the long-run rate. Returns the proposed
    /// experiment id when one was created.
    pub fn review(&self) -> Option<uuid::Uuid> {
        let (baseline, recent_rate, should_propose) = {
            let agg = self.aggregates.lock();
            if agg.outcomes_seen < MIN_OUTCOMES_FOR_PROPOSAL || agg.recent.len() < 10 {
                return None;
            }
            let baseline = agg.conversions as f64 / agg.outcomes_seen as f64;
            let recent_conversions = agg
                .recent
                .iter()
                .filter(|o| **o == ConversationOutcome::Converted)
                .count();
            let recent_rate = recent_conversions as f64 / agg.recent.len() as f64;
            (
                baseline,
                recent_rate,
                baseline > 0.0 && recent_rate < baseline * DROP_RATIO,
            )
        };

        if !should_propose {
            return None;
        }

        let spec = ExperimentSpec {
            name: "conversion-drop-response".into(),
            experiment_type: ExperimentType::StrategyTest,
            hypothesis: format!(
                "recent conversion {recent_rate:.2} trails baseline {baseline:.2}; \
                 a more exploratory strategy recovers it"
            ),
            variants: vec![
                VariantSpec {
                    name: "current-strategy".into(),
                    weight: None,
                    content: serde_json::json!({ "exploration_rate": 0.2 }),
                },
                VariantSpec {
                    name: "higher-exploration".into(),
                    weight: None,
                    content: serde_json::json!({ "exploration_rate": 0.35 }),
                },
            ],
            target_metric: TargetMetric::ConversionRate,
            minimum_sample: 100,
            confidence_level: 0.8,
            auto_deploy_winner: false,
        };

        match self.experiments.create_experiment(spec) {
            Ok(experiment) => {
                self.aggregates.lock().proposals_made += 1;
                tracing::info!(
                    experiment_id = %experiment.id,
                    baseline,
                    recent_rate,
                    "adaptive learning proposed a strategy experiment"
                );
                Some(experiment.id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "experiment proposal rejected");
                None
            }
        }
    }

    pub fn status(&self) -> LearningStatus {
        let agg = self.aggregates.lock();
        let conversion_rate = if agg.outcomes_seen == 0 {
            0.0
        } else {
            agg.conversions as f64 / agg.outcomes_seen as f64
        };
        let recent_conversions = agg
            .recent
            .iter()
            .filter(|o| **o == ConversationOutcome::Converted)
            .count();
        LearningStatus {
            outcomes_seen: agg.outcomes_seen,
            conversion_rate,
            recent_conversion_rate: if agg.recent.is_empty() {
                0.0
            } else {
                recent_conversions as f64 / agg.recent.len() as f64
            },
            avg_engagement: if agg.outcomes_seen == 0 {
                0.0
            } else {
                agg.engagement_sum / agg.outcomes_seen as f64
            },
            proposals_made: agg.proposals_made,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cs_domain::outcome::ConversationMetrics;
    use cs_experiments::LogDeployer;
    use uuid::Uuid;

    fn record(outcome: ConversationOutcome) -> OutcomeRecord {
        OutcomeRecord {
            conversation_id: Uuid::new_v4(),
            outcome,
            tier_recommended: None,
            tier_accepted: None,
            satisfaction: None,
            metrics: ConversationMetrics {
                engagement_score: 5.0,
                ..Default::default()
            },
            experiment_assignments: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    fn learning() -> AdaptiveLearning {
        let framework = Arc::new(ExperimentFramework::new(
            Default::default(),
            Arc::new(LogDeployer),
        ));
        AdaptiveLearning::new(framework)
    }

    #[test]
    fn aggregates_track_conversion_rate() {
        let learning = learning();
        for _ in 0..3 {
            learning.consume(&record(ConversationOutcome::Converted));
        }
        learning.consume(&record(ConversationOutcome::Lost));
        let status = learning.status();
        assert_eq!(status.outcomes_seen, 4);
        assert!((status.conversion_rate - 0.75).abs() < 1e-9);
    }

    #[test]
    fn sustained_drop_triggers_a_proposal() {
        let learning = learning();
        // Healthy history…
        for _ in 0..40 {
            learning.consume(&record(ConversationOutcome::Converted));
        }
        // …then a losing streak fills the recent window.
        for _ in 0..50 {
            learning.consume(&record(ConversationOutcome::Lost));
        }
        assert!(learning.review().is_some());
        assert_eq!(learning.status().proposals_made, 1);
    }

    #[test]
    fn no_proposal_without_enough_data() {
        let learning = learning();
        for _ in 0..5 {
            learning.consume(&record(ConversationOutcome::Lost));
        }
        assert!(learning.review().is_none());
    }
}
