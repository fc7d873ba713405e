//! Document record type.

use crate::types::Sequence;

/// A single record revision read from a keyspace.
///
/// The store does not interpret keys or bodies; both are opaque byte
/// strings. A document with `deleted` set is a tombstone: it still
/// occupies its sequence slot and is returned by sequence enumeration
/// when tombstones are requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Record key (opaque bytes).
    pub key: Vec<u8>,
    /// Sequence at which this revision was written.
    pub sequence: Sequence,
    /// Whether this revision is a tombstone.
    pub deleted: bool,
    /// Record body (opaque bytes; empty for tombstones).
    pub body: Vec<u8>,
}

impl Document {
    /// Creates a live document.
    pub fn new(key: impl Into<Vec<u8>>, sequence: Sequence, body: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            sequence,
            deleted: false,
            body: body.into(),
        }
    }

    /// Creates a tombstone.
    pub fn tombstone(key: impl Into<Vec<u8>>, sequence: Sequence) -> Self {
        Self {
            key: key.into(),
            sequence,
            deleted: true,
            body: Vec::new(),
        }
    }
}
