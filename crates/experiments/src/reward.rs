//! Outcome → reward mapping per target metric.

use cs_domain::outcome::{ConversationOutcome, OutcomeRecord};

use crate::model::TargetMetric;

/// Reward in `[0, 1]` for an outcome under a target metric.
///
/// `optimal_close_secs` parameterizes the `time_to_close` curve: closing
/// at or under the optimum earns up to 1.0, overruns decay toward 0.1.
pub fn reward_for(record: &OutcomeRecord, metric: TargetMetric, optimal_close_secs: u64) -> f64 {
    match metric {
        TargetMetric::ConversionRate => {
            if record.outcome == ConversationOutcome::Converted {
                1.0
            } else {
                0.0
            }
        }
        TargetMetric::EngagementScore => (record.metrics.engagement_score / 10.0).clamp(0.0, 1.0),
        TargetMetric::SatisfactionScore => record
            .satisfaction
            .or(record.metrics.satisfaction_score)
            .map(|s| (s / 10.0).clamp(0.0, 1.0))
            .unwrap_or(0.5),
        TargetMetric::TimeToClose => {
            let duration = record.metrics.total_duration_secs as f64;
            let optimal = optimal_close_secs as f64;
            if duration <= optimal {
                1.0 - (duration / optimal) * 0.5
            } else {
                (0.5 - ((duration - optimal) / optimal) * 0.4).max(0.1)
            }
        }
    }
}
