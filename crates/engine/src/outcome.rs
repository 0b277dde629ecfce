//! In-flight conversation metrics and terminal outcome records.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use cs_domain::conversation::ConversationState;
use cs_domain::outcome::{ConversationMetrics, ConversationOutcome, OutcomeRecord};
use cs_domain::tier::TierLevel;
use cs_domain::trace::TraceEvent;

/// Live per-conversation accumulators.
#[derive(Debug, Default, Clone)]
struct LiveMetrics {
    user_messages: u32,
    assistant_messages: u32,
    total_user_chars: usize,
    response_samples_ms: Vec<u64>,
    last_assistant_at: Option<DateTime<Utc>>,
    satisfaction: Option<f64>,
}

impl LiveMetrics {
    /// Engagement in `[0, 10]`: message volume plus how much the customer
    /// writes per message.
    fn engagement_score(&self) -> f64 {
        if self.user_messages == 0 {
            return 0.0;
        }
        let avg_chars = self.total_user_chars as f64 / self.user_messages as f64;
        let volume = (self.user_messages as f64 * 1.2).min(6.0);
        let depth = (avg_chars / 40.0).min(4.0);
        (volume + depth).min(10.0)
    }
}

/// Tracks in-flight metrics and assembles the final outcome record.
///
/// `record_outcome` is idempotent per conversation: the first call wins,
/// later calls return `None`.
pub struct OutcomeTracker {
    live: RwLock<HashMap<Uuid, LiveMetrics>>,
    recorded: Mutex<HashSet<Uuid>>,
}

impl Default for OutcomeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeTracker {
    pub fn new() -> Self {
        Self {
            live: RwLock::new(HashMap::new()),
            recorded: Mutex::new(HashSet::new()),
        }
    }

    pub fn start_tracking(&self, conversation_id: Uuid) {
        self.live
            .write()
            .entry(conversation_id)
            .or_insert_with(LiveMetrics::default);
    }

    pub fn record_user_message(&self, conversation_id: Uuid, content: &str, at: DateTime<Utc>) {
        let mut live = self.live.write();
        let metrics = live.entry(conversation_id).or_default();
        metrics.user_messages += 1;
        metrics.total_user_chars += content.chars().count();
        // Customer response time: gap since our last assistant message.
        if let Some(last) = metrics.last_assistant_at {
            let ms = at.signed_duration_since(last).num_milliseconds();
            if ms >= 0 {
                metrics.response_samples_ms.push(ms as u64);
            }
        }
    }

    pub fn record_assistant_message(&self, conversation_id: Uuid, at: DateTime<Utc>) {
        let mut live = self.live.write();
        let metrics = live.entry(conversation_id).or_default();
        metrics.assistant_messages += 1;
        metrics.last_assistant_at = Some(at);
    }

    pub fn record_satisfaction(&self, conversation_id: Uuid, score: f64) {
        let mut live = self.live.write();
        live.entry(conversation_id).or_default().satisfaction = Some(score.clamp(0.0, 10.0));
    }

    pub fn engagement_score(&self, conversation_id: Uuid) -> f64 {
        self.live
            .read()
            .get(&conversation_id)
            .map(|m| m.engagement_score())
            .unwrap_or(0.0)
    }

    /// Assemble the outcome record for a terminal conversation.
    ///
    /// Returns `None` when an outcome was already recorded for this
    /// conversation (exactly-one-record invariant).
    pub fn record_outcome(
        &self,
        state: &ConversationState,
        outcome: ConversationOutcome,
        tier_recommended: Option<TierLevel>,
        tier_accepted: Option<TierLevel>,
        satisfaction: Option<f64>,
    ) -> Option<OutcomeRecord> {
        {
            let mut recorded = self.recorded.lock();
            if !recorded.insert(state.id) {
                return None;
            }
        }

        let now = Utc::now();
        let live = self.live.write().remove(&state.id).unwrap_or_default();
        let avg_response_ms = if live.response_samples_ms.is_empty() {
            None
        } else {
            Some(
                live.response_samples_ms.iter().sum::<u64>()
                    / live.response_samples_ms.len() as u64,
            )
        };

        let record = OutcomeRecord {
            conversation_id: state.id,
            outcome,
            tier_recommended: tier_recommended.or_else(|| state.current_tier()),
            tier_accepted,
            satisfaction: satisfaction.or(live.satisfaction),
            metrics: ConversationMetrics {
                engagement_score: live.engagement_score(),
                user_messages: live.user_messages,
                assistant_messages: live.assistant_messages,
                total_duration_secs: state.elapsed_secs(now),
                avg_response_ms,
                satisfaction_score: live.satisfaction,
            },
            experiment_assignments: state.experiment_assignments.clone(),
            recorded_at: now,
        };

        TraceEvent::OutcomeRecorded {
            conversation_id: state.id.to_string(),
            outcome: outcome.to_string(),
        }
        .emit();

        Some(record)
    }

    pub fn already_recorded(&self, conversation_id: Uuid) -> bool {
        self.recorded.lock().contains(&conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_domain::conversation::ProgramType;
    use cs_domain::customer::CustomerData;

    fn state() -> ConversationState {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 34).unwrap();
        ConversationState::new(customer, ProgramType::Prime, 1800, 180)
    }

    #[test]
    fn outcome_is_recorded_exactly_once() {
        let tracker = OutcomeTracker::new();
        let state = state();
        tracker.start_tracking(state.id);

        let first = tracker.record_outcome(&state, ConversationOutcome::Converted, None, None, None);
        assert!(first.is_some());
        let second = tracker.record_outcome(&state, ConversationOutcome::Lost, None, None, None);
        assert!(second.is_none());
        assert!(tracker.already_recorded(state.id));
    }

    #[test]
    fn engagement_grows_with_volume_and_depth() {
        let tracker = OutcomeTracker::new();
        let id = Uuid::new_v4();
        tracker.start_tracking(id);
        assert_eq!(tracker.engagement_score(id), 0.0);

        let now = Utc::now();
        for _ in 0..3 {
            tracker.record_user_message(id, "una respuesta larga y detallada del cliente", now);
        }
        let engaged = tracker.engagement_score(id);
        assert!(engaged > 3.0);
        assert!(engaged <= 10.0);
    }

    #[test]
    fn response_times_average_into_the_record() {
        let tracker = OutcomeTracker::new();
        let state = state();
        tracker.start_tracking(state.id);

        let t0 = Utc::now();
        tracker.record_assistant_message(state.id, t0);
        tracker.record_user_message(state.id, "ok", t0 + chrono::Duration::milliseconds(800));

        let record = tracker
            .record_outcome(&state, ConversationOutcome::EndedNaturally, None, None, None)
            .unwrap();
        assert_eq!(record.metrics.avg_response_ms, Some(800));
        assert_eq!(record.metrics.user_messages, 1);
        assert_eq!(record.metrics.assistant_messages, 1);
    }
}
