//! The table service trait.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TableError;
use crate::filter::Filter;

/// A single table row, keyed by column name.
pub type Row = Map<String, Value>;

/// Primitive operations offered by a remote table service.
///
/// Implementations are the HTTP client ([`RestClient`](crate::RestClient))
/// and the in-memory store ([`MemoryTables`](crate::MemoryTables)).
/// This trait is object-safe and can be used with `Arc<dyn TableService>`.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Select `columns` (comma separated, `*` for all) from rows matching
    /// every filter.
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<Row>, TableError>;

    /// Select exactly one row.
    ///
    /// Fails with [`TableError::SingleRow`] if zero or several rows match.
    async fn select_single(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Row, TableError> {
        let mut rows = self.select(table, columns, filters).await?;
        if rows.len() != 1 {
            return Err(TableError::SingleRow { rows: rows.len() });
        }
        Ok(rows.remove(0))
    }

    /// Insert one row.
    async fn insert(&self, table: &str, record: Row) -> Result<(), TableError>;

    /// Set the given columns on every row matching all filters.
    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<(), TableError>;

    /// Get a human-readable name for this backend.
    fn name(&self) -> &str;
}
