//! Error types for the index engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in index engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store error.
    #[error("storage error: {0}")]
    Storage(#[from] mapview_storage::StorageError),

    /// Collation codec error.
    #[error("collation error: {0}")]
    Collate(#[from] mapview_collate::CollateError),

    /// An index row or back-index record could not be decoded.
    #[error("malformed index row: {message}")]
    CorruptRow {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl EngineError {
    /// Creates a corrupt row error.
    pub fn corrupt_row(message: impl Into<String>) -> Self {
        Self::CorruptRow {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
