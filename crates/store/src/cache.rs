//! In-memory write-through cache keyed by `(table, primary key)`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::provider::{Filters, Row};

/// Concurrent table cache. Successful writes land here so reads can be
/// served during remote outages.
#[derive(Default)]
pub struct TableCache {
    tables: RwLock<HashMap<String, HashMap<String, Row>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a row under its primary key.
    pub fn put(&self, table: &str, key: &str, row: Row) {
        let mut tables = self.tables.write();
        tables
            .entry(table.to_owned())
            .or_default()
            .insert(key.to_owned(), row);
    }

    /// Look up a row by primary key.
    pub fn get(&self, table: &str, key: &str) -> Option<Row> {
        self.tables.read().get(table)?.get(key).cloned()
    }

    /// Remove a row.
    pub fn remove(&self, table: &str, key: &str) {
        if let Some(rows) = self.tables.write().get_mut(table) {
            rows.remove(key);
        }
    }

    /// All cached rows of `table` matching the equality filters.
    pub fn matching(&self, table: &str, filters: &Filters) -> Vec<Row> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(table) else {
            return Vec::new();
        };
        rows.values()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(column, value)| row.get(column) == Some(value))
            })
            .cloned()
            .collect()
    }

    /// Number of cached rows in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |rows| rows.len())
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_get_roundtrip() {
        let cache = TableCache::new();
        cache.put("conversations", "c1", json!({"conversation_id": "c1", "phase": "greeting"}));
        assert_eq!(
            cache.get("conversations", "c1").unwrap()["phase"],
            "greeting"
        );
        assert!(cache.get("conversations", "missing").is_none());
    }

    #[test]
    fn matching_applies_all_filters() {
        let cache = TableCache::new();
        cache.put("t", "1", json!({"id": "1", "customer_id": "a", "phase": "ended"}));
        cache.put("t", "2", json!({"id": "2", "customer_id": "a", "phase": "greeting"}));
        cache.put("t", "3", json!({"id": "3", "customer_id": "b", "phase": "ended"}));

        let filters = vec![
            ("customer_id".to_string(), json!("a")),
            ("phase".to_string(), json!("ended")),
        ];
        let rows = cache.matching("t", &filters);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "1");
    }

    #[test]
    fn put_replaces_existing_key() {
        let cache = TableCache::new();
        cache.put("t", "1", json!({"v": 1}));
        cache.put("t", "1", json!({"v": 2}));
        assert_eq!(cache.len("t"), 1);
        assert_eq!(cache.get("t", "1").unwrap()["v"], 2);
    }
}
