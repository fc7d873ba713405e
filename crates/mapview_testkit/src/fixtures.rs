//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up indexed stores and
//! common test scenarios.

use mapview_collate::{encode, Value};
use mapview_core::{Emitter, Indexer, MapFn, MapIndex, Mappable};
use mapview_storage::Store;
use std::sync::Arc;

/// Default source keyspace used by the fixtures.
pub const SOURCE: &str = "docs";

/// A store plus one index over it, with helpers for the usual test
/// motions: write documents, run the coordinator, inspect rows.
pub struct IndexedStore {
    /// The backing store.
    pub store: Store,
    /// The index under test.
    pub index: MapIndex,
}

impl IndexedStore {
    /// Creates a store with one index named `name` using the given map
    /// function at version "1".
    pub fn new(name: &str, map: Arc<dyn MapFn>) -> Self {
        let store = Store::new();
        let mut index = MapIndex::open(&store, name, SOURCE).expect("open index");
        let mut txn = store.begin();
        index.setup(&mut txn, 0, map, "1").expect("setup index");
        txn.commit().expect("commit setup");
        Self { store, index }
    }

    /// Writes a document whose body is the collatable encoding of `body`.
    pub fn put(&self, doc_id: &[u8], body: &Value) {
        let mut txn = self.store.begin();
        txn.set(SOURCE, doc_id, encode(body)).expect("stage write");
        txn.commit().expect("commit write");
    }

    /// Tombstones a document.
    pub fn delete(&self, doc_id: &[u8]) {
        let mut txn = self.store.begin();
        txn.delete(SOURCE, doc_id).expect("stage delete");
        txn.commit().expect("commit delete");
    }

    /// Runs one coordinator pass over the index and commits it. Returns
    /// whether any indexing work was done.
    pub fn reindex(&self) -> bool {
        let mut txn = self.store.begin();
        let updated = Indexer::new(vec![&self.index], &mut txn)
            .run()
            .expect("indexer run");
        txn.commit().expect("commit run");
        updated
    }
}

/// Map function emitting the whole document body as a single key with no
/// value. The simplest projection that exercises the engine end to end.
pub fn identity_map() -> Arc<dyn MapFn> {
    Arc::new(|doc: &Mappable, emit: &mut Emitter| {
        if let Ok(value) = doc.decode_body() {
            emit.emit(value, None);
        }
    })
}

/// Map function for bodies holding a collatable array of values: each
/// element becomes one key, valued with its position.
pub fn elements_map() -> Arc<dyn MapFn> {
    Arc::new(|doc: &Mappable, emit: &mut Emitter| {
        if let Ok(Value::Array(items)) = doc.decode_body() {
            for (position, item) in items.into_iter().enumerate() {
                emit.emit(item, Some(Value::Int(position as i64)));
            }
        }
    })
}
