//! The resilient facade: remote client + write-through cache + staged
//! writes, composed behind the same [`RowStore`] trait.
//!
//! Reads fall back to the cache during outages. Writes that exhaust their
//! retries are staged and reported as synthetic successes; the reconciler
//! flushes them when connectivity returns. Permanent rejections (constraint
//! violations, permission errors) are never staged — they surface.

use std::sync::Arc;

use async_trait::async_trait;

use cs_domain::error::{Error, Result};

use crate::cache::TableCache;
use crate::provider::{Filters, Row, RowStore};
use crate::rows;
use crate::staged::{StagedQueue, WriteOp};

pub struct ResilientStore {
    remote: Arc<dyn RowStore>,
    cache: TableCache,
    staged: Arc<StagedQueue>,
}

impl ResilientStore {
    pub fn new(remote: Arc<dyn RowStore>) -> Self {
        Self {
            remote,
            cache: TableCache::new(),
            staged: Arc::new(StagedQueue::new()),
        }
    }

    /// The staged-write queue, for wiring up a [`crate::Reconciler`].
    pub fn staged_queue(&self) -> Arc<StagedQueue> {
        self.staged.clone()
    }

    /// The remote transport (the reconciler replays against it directly).
    pub fn remote(&self) -> Arc<dyn RowStore> {
        self.remote.clone()
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    fn cache_key(table: &str, row: &Row) -> Option<String> {
        let pk = rows::primary_key_for(table);
        row.get(pk).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn cache_write(&self, table: &str, row: &Row) {
        if let Some(key) = Self::cache_key(table, row) {
            self.cache.put(table, &key, row.clone());
        }
    }

    /// Stage a failed transient write and report synthetic success.
    fn stage(&self, table: &str, op: WriteOp, row: Option<&Row>) {
        if let Some(row) = row {
            self.cache_write(table, row);
        }
        self.staged.push(table, op);
    }
}

#[async_trait]
impl RowStore for ResilientStore {
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        match self.remote.select(table, filters, limit).await {
            Ok(rows) => {
                for row in &rows {
                    self.cache_write(table, row);
                }
                Ok(rows)
            }
            Err(e) => {
                let cached = self.cache.matching(table, filters);
                if cached.is_empty() {
                    return Err(e);
                }
                tracing::warn!(
                    table,
                    error = %e,
                    served = cached.len(),
                    "remote read failed; serving cached rows"
                );
                let mut cached = cached;
                if let Some(n) = limit {
                    cached.truncate(n);
                }
                Ok(cached)
            }
        }
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        match self.remote.insert(table, row.clone()).await {
            Ok(returned) => {
                self.cache_write(table, &returned);
                Ok(returned)
            }
            Err(e) if e.retriable() => {
                self.stage(table, WriteOp::Insert { row: row.clone() }, Some(&row));
                Ok(row)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, table: &str, row: Row, filters: &Filters) -> Result<Row> {
        match self.remote.update(table, row.clone(), filters).await {
            Ok(returned) => {
                self.cache_write(table, &returned);
                Ok(returned)
            }
            Err(e) if e.retriable() => {
                self.stage(
                    table,
                    WriteOp::Update {
                        row: row.clone(),
                        filters: filters.clone(),
                    },
                    Some(&row),
                );
                Ok(row)
            }
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row> {
        match self.remote.upsert(table, row.clone()).await {
            Ok(returned) => {
                self.cache_write(table, &returned);
                Ok(returned)
            }
            Err(e) if e.retriable() => {
                self.stage(table, WriteOp::Upsert { row: row.clone() }, Some(&row));
                Ok(row)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<()> {
        match self.remote.delete(table, filters).await {
            Ok(()) => {
                for row in self.cache.matching(table, filters) {
                    if let Some(key) = Self::cache_key(table, &row) {
                        self.cache.remove(table, &key);
                    }
                }
                Ok(())
            }
            Err(e) if e.retriable() => {
                for row in self.cache.matching(table, filters) {
                    if let Some(key) = Self::cache_key(table, &row) {
                        self.cache.remove(table, &key);
                    }
                }
                self.staged.push(
                    table,
                    WriteOp::Delete {
                        filters: filters.clone(),
                    },
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn rpc(&self, function: &str, params: Row) -> Result<Row> {
        self.remote.rpc(function, params).await
    }

    async fn check_connection(&self) -> bool {
        self.remote.check_connection().await
    }
}

/// Helper for callers that need exactly one row.
impl ResilientStore {
    pub async fn select_one(&self, table: &str, filters: &Filters) -> Result<Row> {
        let mut rows = self.select(table, filters, Some(1)).await?;
        rows.pop()
            .ok_or_else(|| Error::NotFound(format!("{table} row matching {filters:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRowStore;
    use crate::provider::eq;
    use crate::staged::Reconciler;
    use serde_json::json;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryRowStore>, ResilientStore) {
        let remote = Arc::new(MemoryRowStore::new());
        let store = ResilientStore::new(remote.clone());
        (remote, store)
    }

    #[tokio::test]
    async fn successful_writes_populate_the_cache() {
        let (remote, store) = setup();
        store
            .upsert("conversations", json!({"conversation_id": "c1", "phase": "greeting"}))
            .await
            .unwrap();

        // Remote goes dark — the read is served from cache.
        remote.set_offline(true);
        let rows = store
            .select("conversations", &eq("conversation_id", "c1"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["phase"], "greeting");
    }

    #[tokio::test]
    async fn failed_writes_stage_and_report_synthetic_success() {
        let (remote, store) = setup();
        remote.set_offline(true);

        let row = json!({"conversation_id": "c2", "phase": "greeting"});
        let returned = store.upsert("conversations", row.clone()).await.unwrap();
        assert_eq!(returned, row);
        assert_eq!(store.staged_len(), 1);
        assert_eq!(remote.row_count("conversations"), 0);

        // The row is readable from cache even though the remote never saw it.
        let rows = store
            .select("conversations", &eq("conversation_id", "c2"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        // Reconnect and flush — the write lands remotely.
        remote.set_offline(false);
        let reconciler = Reconciler::new(
            store.remote(),
            store.staged_queue(),
            Duration::from_secs(3600),
        );
        assert_eq!(reconciler.flush().await, 1);
        assert_eq!(remote.row_count("conversations"), 1);
    }

    #[tokio::test]
    async fn read_miss_everywhere_propagates_the_error() {
        let (remote, store) = setup();
        remote.set_offline(true);
        let err = store
            .select("conversations", &eq("conversation_id", "nope"), None)
            .await
            .unwrap_err();
        assert!(err.retriable());
    }

    #[tokio::test]
    async fn select_one_maps_empty_to_not_found() {
        let (_remote, store) = setup();
        let err = store
            .select_one("conversations", &eq("conversation_id", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
