//! Storage error types.
//!
//! Used by repository implementations and callers of storage APIs.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StorageError::NotFound(error.to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}
