//! Staged writes and the background reconciler.
//!
//! When a write exhausts its retries, the resilient facade stages it here
//! and reports a synthetic success. The reconciler replays staged writes
//! in arrival order once connectivity returns (at-least-once delivery;
//! writes are idempotent via their primary key).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use cs_domain::trace::TraceEvent;

use crate::provider::{Filters, Row, RowStore};

/// The write operation to replay.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert { row: Row },
    Update { row: Row, filters: Filters },
    Upsert { row: Row },
    Delete { filters: Filters },
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Insert { .. } => "insert",
            WriteOp::Update { .. } => "update",
            WriteOp::Upsert { .. } => "upsert",
            WriteOp::Delete { .. } => "delete",
        }
    }
}

/// One write waiting to be replayed.
#[derive(Debug, Clone)]
pub struct StagedWrite {
    pub table: String,
    pub op: WriteOp,
    pub staged_at: DateTime<Utc>,
}

/// Append-only queue of staged writes (FIFO replay order).
#[derive(Default)]
pub struct StagedQueue {
    inner: Mutex<VecDeque<StagedWrite>>,
}

impl StagedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, table: &str, op: WriteOp) {
        TraceEvent::WriteStaged {
            table: table.to_owned(),
            op: op.name().to_owned(),
        }
        .emit();
        self.inner.lock().push_back(StagedWrite {
            table: table.to_owned(),
            op,
            staged_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn pop(&self) -> Option<StagedWrite> {
        self.inner.lock().pop_front()
    }

    fn push_front(&self, write: StagedWrite) {
        self.inner.lock().push_front(write);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reconciler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Single-task background flusher for staged writes.
pub struct Reconciler {
    remote: Arc<dyn RowStore>,
    queue: Arc<StagedQueue>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(remote: Arc<dyn RowStore>, queue: Arc<StagedQueue>, interval: Duration) -> Self {
        Self {
            remote,
            queue,
            interval,
        }
    }

    /// Spawn the reconcile loop. The task runs until the handle is aborted.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.queue.is_empty() {
                    continue;
                }
                if !self.remote.check_connection().await {
                    continue;
                }
                self.flush().await;
            }
        })
    }

    /// Replay staged writes in order; stops at the first failure so order
    /// is preserved across outages.
    pub async fn flush(&self) -> usize {
        let mut flushed = 0usize;
        while let Some(write) = self.queue.pop() {
            let result = match &write.op {
                WriteOp::Insert { row } => self
                    .remote
                    .insert(&write.table, row.clone())
                    .await
                    .map(|_| ()),
                WriteOp::Update { row, filters } => self
                    .remote
                    .update(&write.table, row.clone(), filters)
                    .await
                    .map(|_| ()),
                WriteOp::Upsert { row } => self
                    .remote
                    .upsert(&write.table, row.clone())
                    .await
                    .map(|_| ()),
                WriteOp::Delete { filters } => self.remote.delete(&write.table, filters).await,
            };

            match result {
                Ok(()) => flushed += 1,
                Err(e) => {
                    tracing::warn!(
                        table = %write.table,
                        op = write.op.name(),
                        error = %e,
                        "staged write replay failed; will retry next cycle"
                    );
                    self.queue.push_front(write);
                    break;
                }
            }
        }
        if flushed > 0 {
            TraceEvent::StagedFlushed {
                flushed,
                remaining: self.queue.len(),
            }
            .emit();
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRowStore;
    use crate::provider::eq;
    use serde_json::json;

    #[tokio::test]
    async fn flush_replays_in_order_and_preserves_failures() {
        let remote = Arc::new(MemoryRowStore::new());
        let queue = Arc::new(StagedQueue::new());

        queue.push(
            "conversations",
            WriteOp::Upsert {
                row: json!({"conversation_id": "c1", "phase": "greeting"}),
            },
        );
        queue.push(
            "conversations",
            WriteOp::Upsert {
                row: json!({"conversation_id": "c1", "phase": "exploration"}),
            },
        );

        let reconciler = Reconciler::new(
            remote.clone(),
            queue.clone(),
            Duration::from_secs(3600),
        );
        let flushed = reconciler.flush().await;
        assert_eq!(flushed, 2);
        assert!(queue.is_empty());

        // The later write wins (FIFO replay).
        let rows = remote
            .select("conversations", &eq("conversation_id", "c1"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["phase"], "exploration");
    }

    #[tokio::test]
    async fn flush_stops_on_failure_and_requeues() {
        let remote = Arc::new(MemoryRowStore::new());
        let queue = Arc::new(StagedQueue::new());
        queue.push(
            "t",
            WriteOp::Insert {
                row: json!({"id": "a"}),
            },
        );

        remote.set_offline(true);
        let reconciler = Reconciler::new(
            remote.clone(),
            queue.clone(),
            Duration::from_secs(3600),
        );
        assert_eq!(reconciler.flush().await, 0);
        assert_eq!(queue.len(), 1);

        remote.set_offline(false);
        assert_eq!(reconciler.flush().await, 1);
        assert!(queue.is_empty());
    }
}
