//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A blob name is not a single plain file name.
    #[error("invalid blob name: {0:?}")]
    InvalidName(String),

    /// `begin` was called while a transaction is already open.
    #[error("a local transaction is already active")]
    TransactionActive,

    /// `commit` or `rollback` was called without an open transaction.
    #[error("no local transaction is active")]
    NoTransaction,

    /// The handle has been destroyed.
    #[error("resource handle is closed")]
    Closed,
}
