//! Error types for table-client.

use thiserror::Error;

/// Errors that can occur when talking to a table service.
#[derive(Debug, Error)]
pub enum TableError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response returned by the service.
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A single-row fetch matched zero or several rows.
    #[error("expected exactly one row, got {rows}")]
    SingleRow { rows: usize },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TableError {
    /// PostgreSQL error code for a unique constraint violation.
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    /// Check whether this error is a duplicate key on insert.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, TableError::Api { code, .. } if code == Self::UNIQUE_VIOLATION)
    }
}
