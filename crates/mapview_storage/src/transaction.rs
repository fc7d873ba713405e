//! Staged write transactions.

use crate::document::Document;
use crate::error::StorageResult;
use crate::store::Store;
use crate::types::Sequence;
use std::collections::{BTreeMap, HashMap};

/// A write transaction against a [`Store`].
///
/// All mutations are staged in memory and become visible atomically when
/// [`Transaction::commit`] is called; dropping the transaction discards
/// every staged operation. Reads through the transaction observe its own
/// staged writes layered over committed state (read-your-writes).
///
/// Sequence numbers are allocated at staging time, so an abandoned
/// transaction leaves gaps in the sequence space; committed last-sequence
/// counters advance only at commit.
pub struct Transaction {
    store: Store,
    staged: HashMap<String, StagedKeyspace>,
}

#[derive(Default)]
pub(crate) struct StagedKeyspace {
    /// Purge the whole keyspace before applying `writes`.
    pub(crate) erased: bool,
    pub(crate) writes: BTreeMap<Vec<u8>, StagedOp>,
}

pub(crate) enum StagedOp {
    Put {
        sequence: Sequence,
        deleted: bool,
        body: Vec<u8>,
    },
    /// Physical removal; takes no sequence slot.
    Remove,
}

impl Transaction {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            staged: HashMap::new(),
        }
    }

    /// Stages a write of `body` under `key`, returning the sequence
    /// assigned to the new revision.
    pub fn set(&mut self, keyspace: &str, key: &[u8], body: Vec<u8>) -> StorageResult<Sequence> {
        let sequence = self.store.allocate_sequence(keyspace)?;
        self.staged_keyspace(keyspace).writes.insert(
            key.to_vec(),
            StagedOp::Put {
                sequence,
                deleted: false,
                body,
            },
        );
        Ok(sequence)
    }

    /// Stages a tombstone for `key`, returning the sequence assigned to
    /// the deletion. The tombstone occupies a sequence slot and remains
    /// enumerable by sequence.
    pub fn delete(&mut self, keyspace: &str, key: &[u8]) -> StorageResult<Sequence> {
        let sequence = self.store.allocate_sequence(keyspace)?;
        self.staged_keyspace(keyspace).writes.insert(
            key.to_vec(),
            StagedOp::Put {
                sequence,
                deleted: true,
                body: Vec::new(),
            },
        );
        Ok(sequence)
    }

    /// Stages physical removal of `key`. Unlike [`Transaction::delete`],
    /// no tombstone is left and no sequence slot is taken.
    pub fn erase(&mut self, keyspace: &str, key: &[u8]) -> StorageResult<()> {
        self.staged_keyspace(keyspace)
            .writes
            .insert(key.to_vec(), StagedOp::Remove);
        Ok(())
    }

    /// Stages removal of every record in the keyspace, discarding any
    /// writes already staged for it in this transaction.
    pub fn erase_all(&mut self, keyspace: &str) {
        let staged = self.staged_keyspace(keyspace);
        staged.erased = true;
        staged.writes.clear();
    }

    /// Reads a key through this transaction: staged writes first, then
    /// committed state.
    pub fn get(&self, keyspace: &str, key: &[u8]) -> StorageResult<Option<Document>> {
        if let Some(staged) = self.staged.get(keyspace) {
            if let Some(op) = staged.writes.get(key) {
                return Ok(match op {
                    StagedOp::Put {
                        sequence,
                        deleted,
                        body,
                    } => Some(Document {
                        key: key.to_vec(),
                        sequence: *sequence,
                        deleted: *deleted,
                        body: body.clone(),
                    }),
                    StagedOp::Remove => None,
                });
            }
            if staged.erased {
                return Ok(None);
            }
        }
        self.store.get(keyspace, key)
    }

    /// Applies every staged operation atomically and consumes the
    /// transaction.
    pub fn commit(self) -> StorageResult<()> {
        self.store.apply(self.staged)
    }

    /// Discards every staged operation. Equivalent to dropping the
    /// transaction; provided for explicit call sites.
    pub fn abort(self) {}

    fn staged_keyspace(&mut self, keyspace: &str) -> &mut StagedKeyspace {
        self.staged.entry(keyspace.to_string()).or_default()
    }
}
