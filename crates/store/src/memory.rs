//! In-memory [`RowStore`] used by tests and local development.
//!
//! Honors the same filter and primary-key semantics as the HTTP client and
//! doubles as the failure-injection seam for resilience tests via
//! [`MemoryRowStore::set_offline`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use cs_domain::error::{Error, Result};

use crate::provider::{Filters, Row, RowStore};
use crate::rows;

#[derive(Default)]
pub struct MemoryRowStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    offline: AtomicBool,
    /// Fail this many write calls before succeeding again (for retry tests).
    fail_writes: AtomicU32,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with a retriable store error and
    /// `check_connection` reports false.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `n` write calls fail with a retriable 5xx-class error.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |rows| rows.len())
    }

    fn check_offline(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Store {
                message: "connection refused".into(),
                retriable: true,
            });
        }
        Ok(())
    }

    fn check_write_failure(&self) -> Result<()> {
        let remaining = self.fail_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Store {
                message: "simulated 503: service unavailable".into(),
                retriable: true,
            });
        }
        Ok(())
    }

    fn matches(row: &Row, filters: &Filters) -> bool {
        filters
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        self.check_offline()?;
        let tables = self.tables.read();
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(n) = limit {
            rows.truncate(n);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.check_offline()?;
        self.check_write_failure()?;
        self.tables
            .write()
            .entry(table.to_owned())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, row: Row, filters: &Filters) -> Result<Row> {
        self.check_offline()?;
        self.check_write_failure()?;
        let mut tables = self.tables.write();
        if let Some(rows) = tables.get_mut(table) {
            for existing in rows.iter_mut().filter(|r| Self::matches(r, filters)) {
                if let (Some(target), Some(patch)) = (existing.as_object_mut(), row.as_object()) {
                    for (k, v) in patch {
                        target.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row> {
        self.check_offline()?;
        self.check_write_failure()?;
        let pk = rows::primary_key_for(table);
        let key = row.get(pk).cloned();
        let mut tables = self.tables.write();
        let table_rows = tables.entry(table.to_owned()).or_default();
        match key {
            Some(ref key_value) => {
                if let Some(existing) = table_rows
                    .iter_mut()
                    .find(|r| r.get(pk) == Some(key_value))
                {
                    *existing = row.clone();
                } else {
                    table_rows.push(row.clone());
                }
            }
            None => table_rows.push(row.clone()),
        }
        Ok(row)
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<()> {
        self.check_offline()?;
        self.check_write_failure()?;
        if let Some(rows) = self.tables.write().get_mut(table) {
            rows.retain(|row| !Self::matches(row, filters));
        }
        Ok(())
    }

    async fn rpc(&self, _function: &str, _params: Row) -> Result<Row> {
        self.check_offline()?;
        Ok(serde_json::Value::Null)
    }

    async fn check_connection(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::eq;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_is_idempotent_on_primary_key() {
        let store = MemoryRowStore::new();
        store
            .upsert("conversations", json!({"conversation_id": "c1", "phase": "greeting"}))
            .await
            .unwrap();
        store
            .upsert("conversations", json!({"conversation_id": "c1", "phase": "ended"}))
            .await
            .unwrap();
        assert_eq!(store.row_count("conversations"), 1);

        let rows = store
            .select("conversations", &eq("conversation_id", "c1"), None)
            .await
            .unwrap();
        assert_eq!(rows[0]["phase"], "ended");
    }

    #[tokio::test]
    async fn offline_mode_fails_with_retriable_error() {
        let store = MemoryRowStore::new();
        store.set_offline(true);
        let err = store
            .select("conversations", &Vec::new(), None)
            .await
            .unwrap_err();
        assert!(err.retriable());
        assert!(!store.check_connection().await);
    }

    #[tokio::test]
    async fn fail_next_writes_counts_down() {
        let store = MemoryRowStore::new();
        store.fail_next_writes(2);
        assert!(store.insert("t", json!({"id": 1})).await.is_err());
        assert!(store.insert("t", json!({"id": 1})).await.is_err());
        assert!(store.insert("t", json!({"id": 1})).await.is_ok());
    }
}
