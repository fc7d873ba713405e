//! Error types for the storage crate.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error from the underlying medium.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The per-keyspace sequence counter cannot be advanced.
    #[error("sequence counter overflow in keyspace '{keyspace}'")]
    SequenceOverflow {
        /// Keyspace whose counter overflowed.
        keyspace: String,
    },
}
