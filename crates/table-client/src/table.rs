//! Table handles and fluent query builders.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::TableError;
use crate::filter::Filter;
use crate::service::{Row, TableService};

/// Convert a serializable record into a [`Row`].
pub fn to_row<T: Serialize>(record: &T) -> Result<Row, TableError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(TableError::Json(<serde_json::Error as serde::ser::Error>::custom(format!(
            "record must serialize to an object, got {}",
            other
        )))),
    }
}

/// Handle to one table of a [`TableService`].
///
/// Cheap to clone; holds no state besides the service and the table name.
#[derive(Clone)]
pub struct Table {
    service: Arc<dyn TableService>,
    name: String,
}

impl Table {
    /// Create a handle for `name` on the given service.
    pub fn new(service: Arc<dyn TableService>, name: impl Into<String>) -> Self {
        Self {
            service,
            name: name.into(),
        }
    }

    /// Get the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a select of the given columns (comma separated, `*` for all).
    pub fn select(&self, columns: &str) -> SelectQuery<'_> {
        SelectQuery {
            table: self,
            columns: columns.to_string(),
            filters: Vec::new(),
        }
    }

    /// Start an insert of one row.
    pub fn insert(&self, record: Row) -> InsertQuery<'_> {
        InsertQuery {
            table: self,
            record,
        }
    }

    /// Start a partial update setting the columns present in `patch`.
    pub fn update(&self, patch: Row) -> UpdateQuery<'_> {
        UpdateQuery {
            table: self,
            patch,
            filters: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("service", &self.service.name())
            .finish()
    }
}

/// Pending select query.
#[derive(Debug)]
pub struct SelectQuery<'a> {
    table: &'a Table,
    columns: String,
    filters: Vec<Filter>,
}

impl<'a> SelectQuery<'a> {
    /// Keep only rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Require exactly one matching row.
    pub fn single(self) -> SingleQuery<'a> {
        SingleQuery { inner: self }
    }

    /// Run the query.
    pub async fn execute(self) -> Result<Vec<Row>, TableError> {
        self.table
            .service
            .select(&self.table.name, &self.columns, &self.filters)
            .await
    }
}

/// Pending select that must match exactly one row.
#[derive(Debug)]
pub struct SingleQuery<'a> {
    inner: SelectQuery<'a>,
}

impl SingleQuery<'_> {
    /// Run the query.
    pub async fn execute(self) -> Result<Row, TableError> {
        let q = self.inner;
        q.table
            .service
            .select_single(&q.table.name, &q.columns, &q.filters)
            .await
    }

    /// Run the query and deserialize the row.
    pub async fn execute_as<T: DeserializeOwned>(self) -> Result<T, TableError> {
        let row = self.execute().await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }
}

/// Pending insert.
#[derive(Debug)]
pub struct InsertQuery<'a> {
    table: &'a Table,
    record: Row,
}

impl InsertQuery<'_> {
    /// Run the insert.
    pub async fn execute(self) -> Result<(), TableError> {
        self.table.service.insert(&self.table.name, self.record).await
    }
}

/// Pending partial update.
#[derive(Debug)]
pub struct UpdateQuery<'a> {
    table: &'a Table,
    patch: Row,
    filters: Vec<Filter>,
}

impl UpdateQuery<'_> {
    /// Restrict the update to rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Run the update.
    pub async fn execute(self) -> Result<(), TableError> {
        self.table
            .service
            .update(&self.table.name, self.patch, &self.filters)
            .await
    }
}
