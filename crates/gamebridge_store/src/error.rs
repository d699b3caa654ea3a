//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open the SQLite database.
    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// A query or statement failed.
    #[error("query error: {0}")]
    Query(#[from] diesel::result::Error),

    /// A DDL migration failed to apply.
    #[error("migration failed: {message}")]
    Migration {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a migration failure error.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}
