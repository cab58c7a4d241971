//! Error types for geo store operations.

use thiserror::Error;

/// Errors that can occur inside a geo store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write or delete was rejected.
    #[error("{0}")]
    Write(String),

    /// A radius query could not be started.
    #[error("{0}")]
    Query(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to acquire an internal lock.
    #[error("Failed to acquire store lock: {0}")]
    Lock(String),

    /// A persisted row could not be decoded.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Result type for geo store operations.
pub type StoreResult<T> = Result<T, StoreError>;
