//! Background scheduler: timeout sweeps and follow-up scheduling.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use cs_domain::conversation::EndReason;
use cs_domain::trace::TraceEvent;

use crate::orchestrator::Orchestrator;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Follow-ups
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpKind {
    HighIntent,
    ObjectionHandling,
    TransferFollowUp,
}

impl std::fmt::Display for FollowUpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FollowUpKind::HighIntent => "high_intent",
            FollowUpKind::ObjectionHandling => "objection_handling",
            FollowUpKind::TransferFollowUp => "transfer_follow_up",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowUp {
    pub conversation_id: Uuid,
    pub kind: FollowUpKind,
    pub due_at: DateTime<Utc>,
}

/// Pending follow-ups, ordered by due time on drain.
#[derive(Default)]
pub struct FollowUpQueue {
    entries: Mutex<Vec<FollowUp>>,
}

impl FollowUpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, conversation_id: Uuid, kind: FollowUpKind, days_delay: i64) {
        let due_at = Utc::now() + chrono::Duration::days(days_delay);
        TraceEvent::FollowUpScheduled {
            conversation_id: conversation_id.to_string(),
            kind: kind.to_string(),
            due_at: due_at.to_rfc3339(),
        }
        .emit();
        self.entries.lock().push(FollowUp {
            conversation_id,
            kind,
            due_at,
        });
    }

    /// Remove and return everything due at `now`.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<FollowUp> {
        let mut entries = self.entries.lock();
        let (due, pending): (Vec<FollowUp>, Vec<FollowUp>) =
            entries.drain(..).partition(|f| f.due_at <= now);
        *entries = pending;
        let mut due = due;
        due.sort_by_key(|f| f.due_at);
        due
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drives timeouts, follow-up dispatch, and periodic housekeeping.
pub struct Scheduler {
    orchestrator: Orchestrator,
}

impl Scheduler {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Spawn the sweep loop. Runs until the handle is aborted.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        let interval_secs = self
            .orchestrator
            .engine_state()
            .config
            .engine
            .timeout_sweep_interval_secs;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep_timeouts().await;
                self.dispatch_due_follow_ups();
                self.orchestrator.engine_state().locks.prune_idle();
                let _ = self.orchestrator.engine_state().learning.review();
            }
        })
    }

    /// Close every active conversation that outlived its max duration.
    /// Returns how many were closed.
    pub async fn sweep_timeouts(&self) -> usize {
        let state = self.orchestrator.engine_state();
        let now = Utc::now();
        let mut closed = 0usize;

        for conversation_id in state.active_conversations() {
            let conversation = match self.orchestrator.load_state(conversation_id).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %e,
                        "timeout sweep could not load conversation"
                    );
                    continue;
                }
            };
            if conversation.is_terminal() {
                state.mark_inactive(conversation_id);
                continue;
            }
            if conversation.elapsed_secs(now) > conversation.max_duration_secs {
                match self
                    .orchestrator
                    .end_conversation(conversation_id, EndReason::Timeout)
                    .await
                {
                    Ok(_) => closed += 1,
                    Err(e) => tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %e,
                        "timeout close failed"
                    ),
                }
            }
        }
        closed
    }

    /// Emit due follow-ups. Actual delivery (email, call queue) is an
    /// external collaborator; the engine just surfaces the events.
    pub fn dispatch_due_follow_ups(&self) -> usize {
        let due = self
            .orchestrator
            .engine_state()
            .follow_ups
            .take_due(Utc::now());
        for follow_up in &due {
            TraceEvent::FollowUpDue {
                conversation_id: follow_up.conversation_id.to_string(),
                kind: follow_up.kind.to_string(),
            }
            .emit();
        }
        due.len()
    }
}

/// Accessor used by the scheduler loop; kept on the orchestrator so the
/// scheduler does not reach into engine internals.
impl Orchestrator {
    pub fn follow_up_backlog(&self) -> usize {
        self.engine_state().follow_ups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_entries_drain_in_due_order() {
        let queue = FollowUpQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        queue.schedule(a, FollowUpKind::HighIntent, -1);
        queue.schedule(b, FollowUpKind::ObjectionHandling, -2);
        queue.schedule(c, FollowUpKind::TransferFollowUp, 3);

        let due = queue.take_due(Utc::now());
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].conversation_id, b);
        assert_eq!(due[1].conversation_id, a);
        // The future entry stays queued.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn nothing_due_nothing_drained() {
        let queue = FollowUpQueue::new();
        queue.schedule(Uuid::new_v4(), FollowUpKind::HighIntent, 1);
        assert!(queue.take_due(Utc::now()).is_empty());
        assert_eq!(queue.len(), 1);
    }
}
