//! Per-conversation concurrency control.
//!
//! Ensures only one turn runs per conversation at a time. A second
//! message arriving while a turn is in flight queues on the semaphore and
//! proceeds when the current turn finishes; turns on different
//! conversations run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

/// Manages per-conversation run locks.
///
/// Each conversation id maps to a `Semaphore(1)`. Holding the permit
/// grants exclusive access for the load-analyze-decide-reply-persist
/// sequence; it auto-releases on drop.
pub struct ConversationLockMap {
    locks: Mutex<HashMap<Uuid, Arc<Semaphore>>>,
}

impl Default for ConversationLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for a conversation, waiting if a turn is
    /// already in flight.
    pub async fn acquire(&self, conversation_id: Uuid) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(conversation_id)
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned()
            .await
            .expect("conversation semaphore never closed")
    }

    /// Number of tracked conversations (for monitoring).
    pub fn conversation_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop lock entries for conversations that aren't actively held.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }

    /// Remove a specific conversation's lock entry (terminal cleanup).
    pub fn remove(&self, conversation_id: Uuid) {
        self.locks.lock().remove(&conversation_id);
    }
}
