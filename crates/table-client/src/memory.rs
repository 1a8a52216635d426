//! In-memory table service for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::TableError;
use crate::filter::Filter;
use crate::service::{Row, TableService};

/// Counters of operations served by [`MemoryTables`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Select calls (including single-row selects).
    pub reads: u64,
    /// Insert and update calls.
    pub writes: u64,
}

/// A table service that keeps every table in process memory.
///
/// Tables are created on first use. Each table treats `id` as a unique
/// primary key, rejecting duplicate inserts with the same error code a
/// PostgreSQL backend would return.
#[derive(Debug, Default)]
pub struct MemoryTables {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryTables {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows in a table, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Operation counters since creation or the last reset.
    pub fn stats(&self) -> OpStats {
        OpStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    /// Reset the operation counters.
    pub fn reset_stats(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }
}

fn project(row: &Row, columns: &str) -> Row {
    if columns.trim() == "*" {
        return row.clone();
    }
    columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl TableService for MemoryTables {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<Row>, TableError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let tables = self.tables.lock().await;
        let rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .map(|row| project(row, columns))
                    .collect()
            })
            .unwrap_or_default();

        Ok(rows)
    }

    async fn insert(&self, table: &str, record: Row) -> Result<(), TableError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(id) = record.get("id").filter(|id| !id.is_null()) {
            let key = Filter::eq("id", id.clone());
            if rows.iter().any(|row| key.matches(row)) {
                return Err(TableError::Api {
                    status: 409,
                    code: TableError::UNIQUE_VIOLATION.to_string(),
                    message: format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
                });
            }
        }

        rows.push(record);
        Ok(())
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<(), TableError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().await;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filters.iter().all(|f| f.matches(row))) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Build a row from a JSON object literal.
///
/// Non-object values produce an empty row.
pub fn row_from(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_empty_table() {
        let db = MemoryTables::new();
        let rows = db.select("users", "*", &[]).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(db.stats(), OpStats { reads: 1, writes: 0 });
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = MemoryTables::new();
        db.insert("users", row_from(json!({"id": 1}))).await.unwrap();

        let err = db
            .insert("users", row_from(json!({"id": 1, "name": "again"})))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(db.rows("users").await.len(), 1);
    }

    #[tokio::test]
    async fn test_projection() {
        let db = MemoryTables::new();
        db.insert("users", row_from(json!({"id": 1, "name": "a", "age": 3})))
            .await
            .unwrap();

        let rows = db
            .select("users", "id, name", &[Filter::eq("id", 1)])
            .await
            .unwrap();
        assert_eq!(rows[0], row_from(json!({"id": 1, "name": "a"})));
    }

    #[tokio::test]
    async fn test_select_single_counts() {
        let db = MemoryTables::new();
        db.insert("t", row_from(json!({"id": 1, "k": "x"}))).await.unwrap();
        db.insert("t", row_from(json!({"id": 2, "k": "x"}))).await.unwrap();

        let err = db
            .select_single("t", "*", &[Filter::eq("k", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::SingleRow { rows: 2 }));

        let row = db.select_single("t", "*", &[Filter::eq("id", 2)]).await.unwrap();
        assert_eq!(row.get("id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_update_only_matching_rows() {
        let db = MemoryTables::new();
        db.insert("t", row_from(json!({"id": 1, "v": 0}))).await.unwrap();
        db.insert("t", row_from(json!({"id": 2, "v": 0}))).await.unwrap();

        db.update("t", row_from(json!({"v": 9})), &[Filter::eq("id", 2)])
            .await
            .unwrap();

        let rows = db.rows("t").await;
        assert_eq!(rows[0].get("v"), Some(&json!(0)));
        assert_eq!(rows[1].get("v"), Some(&json!(9)));
        assert_eq!(db.stats().writes, 3);

        db.reset_stats();
        assert_eq!(db.stats(), OpStats::default());
    }
}
