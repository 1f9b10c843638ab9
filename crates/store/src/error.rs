//! Store errors

use thiserror::Error;

/// Errors from a store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Row not found: {0}")]
    MissingRow(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
