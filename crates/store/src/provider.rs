//! The row-store contract every transport implements.

use async_trait::async_trait;

use cs_domain::error::Result;

/// One persisted row, as loosely-typed JSON.
pub type Row = serde_json::Value;

/// Equality filters applied to a select/update/delete, in column order.
pub type Filters = Vec<(String, serde_json::Value)>;

/// Contract exposed to the orchestrator and friends.
///
/// All operations are asynchronous. Writes are idempotent as long as the
/// caller supplies the table's primary key inside the row.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Select rows matching all `filters` (logical AND).
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Row>>;

    /// Insert a new row.
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Update rows matching `filters` with the fields present in `row`.
    async fn update(&self, table: &str, row: Row, filters: &Filters) -> Result<Row>;

    /// Insert-or-update keyed on the table's primary key.
    async fn upsert(&self, table: &str, row: Row) -> Result<Row>;

    /// Delete rows matching `filters`.
    async fn delete(&self, table: &str, filters: &Filters) -> Result<()>;

    /// Invoke a server-side function.
    async fn rpc(&self, function: &str, params: Row) -> Result<Row>;

    /// Cheap connectivity probe.
    async fn check_connection(&self) -> bool;
}

/// Build a single-column equality filter.
pub fn eq(column: &str, value: impl Into<serde_json::Value>) -> Filters {
    vec![(column.to_string(), value.into())]
}
