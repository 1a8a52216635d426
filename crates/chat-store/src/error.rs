//! Store error types.

use table_client::TableError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote table service error (connection, query, server).
    #[error("remote service error: {0}")]
    Remote(#[from] TableError),

    /// JSON conversion error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// No dialog id was given and the user has no current dialog.
    #[error("user {user_id} has no current dialog")]
    NoCurrentDialog { user_id: i64 },

    /// A counter update would leave the representable range.
    #[error("{counter} overflow for user {user_id}")]
    CounterOverflow { counter: &'static str, user_id: i64 },

    /// Attribute name is not a user field.
    #[error("unknown user attribute: {0}")]
    UnknownAttribute(String),

    /// Attribute exists but cannot be written.
    #[error("user attribute is read-only: {0}")]
    ReadOnlyAttribute(&'static str),

    /// Model is not in the configured list.
    #[error("model not available: {0}")]
    UnknownModel(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn user_not_found(user_id: i64) -> Self {
        StoreError::NotFound {
            entity: "User",
            id: user_id.to_string(),
        }
    }

    pub(crate) fn dialog_not_found(dialog_id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: "Dialog",
            id: dialog_id.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
