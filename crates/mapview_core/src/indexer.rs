//! Multi-index coordinator.

use crate::error::EngineResult;
use crate::index::MapIndex;
use crate::mappable::Mappable;
use mapview_storage::Transaction;
use tracing::debug;

/// Updates a set of indexes sharing one source keyspace in a single
/// enumeration pass.
///
/// The coordinator computes the minimum catch-up point across its indexes
/// and enumerates source documents once, ascending by sequence and
/// including tombstones, applying each document to every index. Indexes
/// already past a document ignore it, so indexes at different catch-up
/// points share the one scan instead of issuing one scan each.
///
/// Metadata is persisted once per index after the scan completes; an
/// interrupted run persists nothing, so a retry resumes from the original
/// start sequence. All effects ride on the supplied transaction and become
/// visible only when the caller commits it.
///
/// Passing an empty index set, a trigger that is not among the managed
/// indexes, or indexes over different source keyspaces is a programming
/// error.
pub struct Indexer<'a> {
    indexes: Vec<&'a MapIndex>,
    txn: &'a mut Transaction,
    trigger: Option<usize>,
    finished: bool,
}

impl<'a> Indexer<'a> {
    /// Creates a coordinator over the given indexes and transaction.
    pub fn new(indexes: Vec<&'a MapIndex>, txn: &'a mut Transaction) -> Self {
        assert!(!indexes.is_empty(), "indexer requires at least one index");
        let source = indexes[0].source();
        assert!(
            indexes.iter().all(|index| index.source() == source),
            "all indexes must share one source keyspace"
        );
        Self {
            indexes,
            txn,
            trigger: None,
            finished: false,
        }
    }

    /// Designates the index whose staleness decides whether the run
    /// proceeds at all: if the trigger is already caught up, [`run`]
    /// aborts without scanning, even when other indexes are behind.
    ///
    /// [`run`]: Indexer::run
    pub fn set_trigger(&mut self, trigger: &MapIndex) {
        let position = self
            .indexes
            .iter()
            .position(|index| std::ptr::eq(*index, trigger));
        self.trigger = Some(position.expect("trigger index must be among the managed indexes"));
    }

    /// Runs one indexing pass.
    ///
    /// Returns `false` without touching anything when no index needs
    /// updating (or the trigger index doesn't); returns `true` after a
    /// completed scan. On error, no metadata has been saved and the
    /// transaction can be dropped to discard partial row writes.
    pub fn run(&mut self) -> EngineResult<bool> {
        let store = self.indexes[0].store().clone();
        let source = self.indexes[0].source();

        for index in &self.indexes {
            index.prepare(self.txn)?;
        }

        let latest = store.last_sequence(source)?;

        // Find the lowest sequence not yet indexed everywhere.
        let mut start = latest.next();
        for (position, index) in self.indexes.iter().enumerate() {
            let last = index.last_sequence_indexed()?;
            if last < latest {
                start = start.min(last.next());
            } else if self.trigger == Some(position) {
                debug!(index = index.name(), "trigger index already caught up");
                return Ok(false);
            }
        }
        if start > latest {
            return Ok(false);
        }

        debug!(
            source,
            from = start.as_u64(),
            to = latest.as_u64(),
            indexes = self.indexes.len(),
            "indexing documents"
        );
        let documents = store.documents_by_sequence(source, start, latest, true)?;
        for document in documents {
            let mappable = Mappable::new(document);
            for index in &self.indexes {
                index.update_document(self.txn, &mappable)?;
            }
        }

        for index in &self.indexes {
            index.save_state(self.txn)?;
        }
        self.finished = true;
        Ok(true)
    }

    /// Whether a run completed and saved every index's metadata.
    pub fn finished(&self) -> bool {
        self.finished
    }
}
