//! In-memory ordered store.

use crate::document::Document;
use crate::error::{StorageError, StorageResult};
use crate::transaction::Transaction;
use crate::types::Sequence;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// An ordered, sequence-numbered, multi-keyspace key-value store.
///
/// Each named keyspace is an independent ordered map from opaque byte keys
/// to record revisions, with its own monotonic sequence counter. Keyspaces
/// are created lazily on first write; reading an unknown keyspace behaves
/// like reading an empty one.
///
/// Writes go through [`Transaction`]s obtained from [`Store::begin`] and
/// become visible atomically at commit. Committed readers never observe
/// staged state.
///
/// # Thread Safety
///
/// The store is cheaply cloneable (`Arc` inside) and safe to share across
/// threads; writers serialize on an interior lock at commit.
#[derive(Clone, Default)]
pub struct Store {
    shared: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    keyspaces: HashMap<String, Keyspace>,
}

#[derive(Default)]
struct Keyspace {
    by_key: BTreeMap<Vec<u8>, Record>,
    /// Latest revision of each key, indexed by sequence.
    by_sequence: BTreeMap<u64, Vec<u8>>,
    /// Last allocated sequence (staged writes included).
    next_sequence: u64,
    /// Last committed sequence.
    last_committed: u64,
}

#[derive(Clone)]
struct Record {
    sequence: u64,
    deleted: bool,
    body: Vec<u8>,
}

impl Record {
    fn to_document(&self, key: &[u8]) -> Document {
        Document {
            key: key.to_vec(),
            sequence: Sequence::new(self.sequence),
            deleted: self.deleted,
            body: self.body.clone(),
        }
    }
}

impl Store {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new transaction against this store.
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Returns the last committed sequence of a keyspace.
    ///
    /// An unknown keyspace reports sequence zero.
    pub fn last_sequence(&self, keyspace: &str) -> StorageResult<Sequence> {
        let inner = self.shared.read();
        Ok(inner
            .keyspaces
            .get(keyspace)
            .map(|ks| Sequence::new(ks.last_committed))
            .unwrap_or(Sequence::ZERO))
    }

    /// Reads the committed revision of a key, tombstones included.
    pub fn get(&self, keyspace: &str, key: &[u8]) -> StorageResult<Option<Document>> {
        let inner = self.shared.read();
        Ok(inner
            .keyspaces
            .get(keyspace)
            .and_then(|ks| ks.by_key.get(key))
            .map(|record| record.to_document(key)))
    }

    /// Returns the first live record within the given key bounds, or
    /// `None` if the range holds none.
    pub fn first_in_range(
        &self,
        keyspace: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> StorageResult<Option<Document>> {
        let inner = self.shared.read();
        let Some(ks) = inner.keyspaces.get(keyspace) else {
            return Ok(None);
        };
        Ok(ks
            .by_key
            .range::<[u8], _>((lower, upper))
            .find(|(_, record)| !record.deleted)
            .map(|(key, record)| record.to_document(key)))
    }

    /// Returns the last live record within the given key bounds, or
    /// `None` if the range holds none.
    pub fn last_in_range(
        &self,
        keyspace: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> StorageResult<Option<Document>> {
        let inner = self.shared.read();
        let Some(ks) = inner.keyspaces.get(keyspace) else {
            return Ok(None);
        };
        Ok(ks
            .by_key
            .range::<[u8], _>((lower, upper))
            .rev()
            .find(|(_, record)| !record.deleted)
            .map(|(key, record)| record.to_document(key)))
    }

    /// Returns committed documents in ascending sequence order over the
    /// inclusive range `[from, to]`.
    ///
    /// Only the latest revision of each key occupies a sequence slot.
    /// Tombstones are included when `include_deleted` is set.
    pub fn documents_by_sequence(
        &self,
        keyspace: &str,
        from: Sequence,
        to: Sequence,
        include_deleted: bool,
    ) -> StorageResult<Vec<Document>> {
        let inner = self.shared.read();
        let Some(ks) = inner.keyspaces.get(keyspace) else {
            return Ok(Vec::new());
        };
        let mut documents = Vec::new();
        for (_, key) in ks.by_sequence.range(from.as_u64()..=to.as_u64()) {
            if let Some(record) = ks.by_key.get(key) {
                if record.deleted && !include_deleted {
                    continue;
                }
                documents.push(record.to_document(key));
            }
        }
        Ok(documents)
    }

    /// Returns the number of live (non-tombstone) records in a keyspace.
    pub fn document_count(&self, keyspace: &str) -> StorageResult<u64> {
        let inner = self.shared.read();
        Ok(inner
            .keyspaces
            .get(keyspace)
            .map(|ks| ks.by_key.values().filter(|r| !r.deleted).count() as u64)
            .unwrap_or(0))
    }

    /// Allocates the next sequence number of a keyspace.
    ///
    /// Called by transactions when staging writes; the committed
    /// `last_sequence` does not advance until commit.
    pub(crate) fn allocate_sequence(&self, keyspace: &str) -> StorageResult<Sequence> {
        let mut inner = self.shared.write();
        let ks = inner.keyspaces.entry(keyspace.to_string()).or_default();
        ks.next_sequence =
            ks.next_sequence
                .checked_add(1)
                .ok_or_else(|| StorageError::SequenceOverflow {
                    keyspace: keyspace.to_string(),
                })?;
        Ok(Sequence::new(ks.next_sequence))
    }

    /// Applies a transaction's staged operations atomically.
    pub(crate) fn apply(
        &self,
        staged: HashMap<String, crate::transaction::StagedKeyspace>,
    ) -> StorageResult<()> {
        let mut inner = self.shared.write();
        for (name, staged_ks) in staged {
            let ks = inner.keyspaces.entry(name).or_default();
            if staged_ks.erased {
                ks.by_key.clear();
                ks.by_sequence.clear();
            }
            for (key, op) in staged_ks.writes {
                match op {
                    crate::transaction::StagedOp::Put {
                        sequence,
                        deleted,
                        body,
                    } => {
                        if let Some(old) = ks.by_key.get(&key) {
                            ks.by_sequence.remove(&old.sequence);
                        }
                        ks.by_sequence.insert(sequence.as_u64(), key.clone());
                        ks.last_committed = ks.last_committed.max(sequence.as_u64());
                        ks.by_key.insert(
                            key,
                            Record {
                                sequence: sequence.as_u64(),
                                deleted,
                                body,
                            },
                        );
                    }
                    crate::transaction::StagedOp::Remove => {
                        if let Some(old) = ks.by_key.remove(&key) {
                            ks.by_sequence.remove(&old.sequence);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
