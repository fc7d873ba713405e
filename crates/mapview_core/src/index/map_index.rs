//! Single incremental index.

use crate::error::{EngineError, EngineResult};
use crate::index::rows;
use crate::index::state::{IndexState, StateRecord};
use crate::index::writer::RowWriter;
use crate::mappable::{Emitter, MapFn, Mappable};
use mapview_storage::{Sequence, Store, Transaction};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// One incremental index over one source keyspace.
///
/// The index owns a keyspace of its own in the same store as its source.
/// Its persisted metadata lives under a reserved sentinel key in that
/// keyspace; the rows and per-document back-index records fill the rest
/// (see the `rows` module for the layout).
///
/// Metadata is cached in memory and re-read only when the index keyspace's
/// committed sequence has moved since the cache was last refreshed, so
/// accessor calls stay cheap. The cache is owned by this instance; the
/// engine assumes one writer at a time per index, enforced by the host's
/// transaction discipline rather than by this layer.
pub struct MapIndex {
    store: Store,
    name: String,
    source: String,
    map: Option<Arc<dyn MapFn>>,
    index_type: i32,
    map_version: String,
    state: RwLock<CachedState>,
}

#[derive(Default)]
struct CachedState {
    inner: IndexState,
    /// Index keyspace sequence at which the cache was last refreshed.
    read_at: Sequence,
    /// An obsolete-format record was read; rows must be erased before the
    /// next indexing pass.
    needs_rebuild: bool,
}

impl MapIndex {
    /// Opens the index stored in keyspace `name`, indexing documents of
    /// keyspace `source`. Reads persisted metadata if any exists.
    pub fn open(store: &Store, name: &str, source: &str) -> EngineResult<Self> {
        let index = Self {
            store: store.clone(),
            name: name.to_string(),
            source: source.to_string(),
            map: None,
            index_type: 0,
            map_version: String::new(),
            state: RwLock::new(CachedState::default()),
        };
        index.read_state()?;
        Ok(index)
    }

    /// The index's keyspace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source keyspace this index projects.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Registers the map function and its declared type and version.
    ///
    /// A mismatch against the persisted type or version invalidates the
    /// index: all rows are erased (when any were built) and the counters
    /// reset, so the next coordinator run rebuilds from sequence 1. This
    /// makes map-function changes self-healing: bump the version string
    /// and the index rebuilds itself.
    pub fn setup(
        &mut self,
        txn: &mut Transaction,
        index_type: i32,
        map: Arc<dyn MapFn>,
        map_version: &str,
    ) -> EngineResult<()> {
        self.read_state()?;
        self.map = Some(map);
        self.index_type = index_type;
        self.map_version = map_version.to_string();

        let (mismatch, had_rows, pending) = {
            let cached = self.state.read();
            (
                index_type != cached.inner.index_type
                    || map_version != cached.inner.last_map_version,
                cached.inner.last_sequence_indexed > Sequence::ZERO,
                cached.needs_rebuild,
            )
        };
        if mismatch || pending {
            debug!(index = %self.name, version = map_version, "map function changed; index will rebuild");
            self.invalidate(txn, had_rows || pending)?;
        }
        Ok(())
    }

    /// Drops all rows and resets the counters, leaving the registered map
    /// function and declared version in place. The next coordinator run
    /// rebuilds the index from sequence 1.
    pub fn erase(&self, txn: &mut Transaction) -> EngineResult<()> {
        self.invalidate(txn, true)
    }

    /// Last source sequence this index has processed.
    pub fn last_sequence_indexed(&self) -> EngineResult<Sequence> {
        self.read_state()?;
        Ok(self.state.read().inner.last_sequence_indexed)
    }

    /// Last source sequence at which this index's rows actually changed.
    pub fn last_sequence_changed_at(&self) -> EngineResult<Sequence> {
        self.read_state()?;
        Ok(self.state.read().inner.last_sequence_changed_at)
    }

    /// Number of live rows, maintained incrementally.
    pub fn row_count(&self) -> EngineResult<u64> {
        self.read_state()?;
        Ok(self.state.read().inner.row_count)
    }

    /// Applies one source document to the index.
    ///
    /// Documents at or below the last indexed sequence are ignored, which
    /// guards against reprocessing and out-of-order replay. Tombstones
    /// never reach the map function; their empty emission erases every
    /// prior row of the document. The last-indexed sequence advances
    /// unconditionally; the returned flag reports whether any row changed,
    /// advances the changed-at sequence when set, and is the dirty signal
    /// a live query should watch.
    pub fn update_document(&self, txn: &mut Transaction, doc: &Mappable) -> EngineResult<bool> {
        let last = self.state.read().inner.last_sequence_indexed;
        if doc.sequence() <= last {
            return Ok(false);
        }

        let mut emitter = Emitter::new();
        if !doc.deleted() {
            let map = self.map.as_ref().ok_or_else(|| {
                EngineError::invalid_operation("index has no map function; call setup first")
            })?;
            map.map(doc, &mut emitter);
        }

        let mut cached = self.state.write();
        cached.inner.last_sequence_indexed = doc.sequence();
        let changed = RowWriter::new(&self.name).update(
            txn,
            doc.doc_id(),
            doc.sequence(),
            emitter.into_pairs(),
            &mut cached.inner.row_count,
        )?;
        if changed {
            cached.inner.last_sequence_changed_at = doc.sequence();
        }
        Ok(changed)
    }

    /// Persists the metadata record. Called once per index at the end of a
    /// completed coordinator run; takes effect when the transaction
    /// commits.
    pub fn save_state(&self, txn: &mut Transaction) -> EngineResult<()> {
        let mut cached = self.state.write();
        cached.inner.last_map_version = self.map_version.clone();
        cached.inner.index_type = self.index_type;
        let body = cached.inner.encode();
        let sequence = txn.set(&self.name, &rows::state_key(), body)?;
        cached.read_at = sequence;
        Ok(())
    }

    /// Erases rows scheduled for removal by an obsolete-format detection.
    /// Called at the start of a coordinator pass, before any document is
    /// applied.
    pub(crate) fn prepare(&self, txn: &mut Transaction) -> EngineResult<()> {
        self.read_state()?;
        if self.state.read().needs_rebuild {
            self.invalidate(txn, true)?;
        }
        Ok(())
    }

    /// Re-reads persisted metadata when the index keyspace has moved past
    /// the cached snapshot.
    fn read_state(&self) -> EngineResult<()> {
        let current = self.store.last_sequence(&self.name)?;
        let mut cached = self.state.write();
        if cached.read_at == current {
            return Ok(());
        }
        let record = match self.store.get(&self.name, &rows::state_key())? {
            Some(doc) if !doc.deleted => IndexState::decode(&doc.body)?,
            _ => StateRecord::Absent,
        };
        match record {
            StateRecord::Current(state) => {
                cached.inner = state;
                cached.needs_rebuild = false;
            }
            StateRecord::Absent => {
                cached.inner = IndexState::default();
                cached.needs_rebuild = false;
            }
            StateRecord::Obsolete => {
                debug!(index = %self.name, "obsolete index format; index will rebuild");
                cached.inner = IndexState::default();
                cached.needs_rebuild = true;
            }
        }
        cached.read_at = current;
        Ok(())
    }

    /// Resets the counters and, when `erase_rows` is set, stages erasure
    /// of every record in the index keyspace in the same transactional
    /// step, so counters and rows cannot be durably observed out of step.
    ///
    /// The cache keeps the reset visible for the rest of the transaction;
    /// if the transaction is abandoned, the next `setup` sees the version
    /// mismatch again and re-stages the erasure.
    fn invalidate(&self, txn: &mut Transaction, erase_rows: bool) -> EngineResult<()> {
        if erase_rows {
            txn.erase_all(&self.name);
        }
        let mut cached = self.state.write();
        cached.inner.last_sequence_indexed = Sequence::ZERO;
        cached.inner.last_sequence_changed_at = Sequence::ZERO;
        cached.inner.row_count = 0;
        cached.needs_rebuild = false;
        Ok(())
    }
}
