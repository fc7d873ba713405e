//! Error types for the collation codec.

use thiserror::Error;

/// Result type for collation operations.
pub type CollateResult<T> = Result<T, CollateError>;

/// Errors that can occur while decoding collatable bytes.
///
/// Encoding is infallible: every [`crate::Value`] has a defined encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollateError {
    /// Input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// The byte at a tag position is not a known type tag.
    #[error("invalid type tag {tag:#04x} at offset {offset}")]
    InvalidTag {
        /// The offending byte.
        tag: u8,
        /// Offset of the byte in the input.
        offset: usize,
    },

    /// A value of a different type was found where a specific type was
    /// required.
    #[error("expected {expected} at offset {offset}")]
    UnexpectedTag {
        /// Name of the expected type.
        expected: &'static str,
        /// Offset of the tag byte in the input.
        offset: usize,
    },

    /// An integer field does not fit in `i64`.
    #[error("integer out of range at offset {offset}")]
    IntOutOfRange {
        /// Offset of the integer's tag byte.
        offset: usize,
    },

    /// A 0x00 byte inside a text or bytes value was not followed by a
    /// valid escape or terminator byte.
    #[error("malformed escape sequence at offset {offset}")]
    BadEscape {
        /// Offset of the escape byte.
        offset: usize,
    },

    /// A text value is not valid UTF-8.
    #[error("invalid UTF-8 in text value")]
    InvalidUtf8,

    /// Bytes remain after the decoded value.
    #[error("trailing bytes after value")]
    TrailingData,
}
