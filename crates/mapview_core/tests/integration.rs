//! End-to-end scenarios for the index engine.

use mapview_collate::{encode, Value};
use mapview_core::{
    Emitter, Indexer, MapFn, MapIndex, Mappable, MultiKeyEnumerator, QueryEnumerator,
    QueryOptions, SetMode,
};
use mapview_storage::{Sequence, Store};
use std::sync::Arc;

const SRC: &str = "docs";
const IDX: &str = "docs.view";

fn text(s: &str) -> Value {
    Value::Text(s.into())
}

/// Map function: the body is a collatable array of [key, value] arrays;
/// each pair becomes one row.
fn pairs_map() -> Arc<dyn MapFn> {
    Arc::new(|doc: &Mappable, emit: &mut Emitter| {
        if let Ok(Value::Array(pairs)) = doc.decode_body() {
            for pair in pairs {
                if let Value::Array(kv) = pair {
                    let mut kv = kv.into_iter();
                    if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
                        emit.emit(key, Some(value));
                    }
                }
            }
        }
    })
}

fn body(pairs: &[(&str, i64)]) -> Vec<u8> {
    encode(&Value::Array(
        pairs
            .iter()
            .map(|(k, v)| Value::Array(vec![text(k), Value::Int(*v)]))
            .collect(),
    ))
}

fn put(store: &Store, doc_id: &[u8], pairs: &[(&str, i64)]) {
    let mut txn = store.begin();
    txn.set(SRC, doc_id, body(pairs)).unwrap();
    txn.commit().unwrap();
}

fn delete(store: &Store, doc_id: &[u8]) {
    let mut txn = store.begin();
    txn.delete(SRC, doc_id).unwrap();
    txn.commit().unwrap();
}

fn open(store: &Store, version: &str) -> MapIndex {
    let mut index = MapIndex::open(store, IDX, SRC).unwrap();
    let mut txn = store.begin();
    index.setup(&mut txn, 0, pairs_map(), version).unwrap();
    txn.commit().unwrap();
    index
}

fn reindex(store: &Store, index: &MapIndex) -> bool {
    let mut txn = store.begin();
    let updated = Indexer::new(vec![index], &mut txn).run().unwrap();
    txn.commit().unwrap();
    updated
}

fn all_rows(index: &MapIndex) -> Vec<(Value, Vec<u8>, i64)> {
    QueryEnumerator::range(index, None, None, None, None, QueryOptions::default())
        .map(|row| {
            let value = row.value.and_then(|v| v.as_int()).unwrap_or(0);
            (row.key, row.doc_id, value)
        })
        .collect()
}

#[test]
fn end_to_end_scenario() {
    // Two documents, one emitted key each.
    let store = Store::new();
    put(&store, b"d1", &[("a", 1)]);
    put(&store, b"d2", &[("b", 2)]);

    let index = open(&store, "1");
    assert!(reindex(&store, &index));

    assert_eq!(index.row_count().unwrap(), 2);
    assert_eq!(index.last_sequence_indexed().unwrap(), Sequence::new(2));

    // Range query over ["a".."b"] returns both rows in key order.
    let rows: Vec<_> = QueryEnumerator::range(
        &index,
        Some(text("a")),
        None,
        Some(text("b")),
        None,
        QueryOptions::default(),
    )
    .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, text("a"));
    assert_eq!(rows[0].doc_id, b"d1");
    assert_eq!(rows[0].sequence, Sequence::new(1));
    assert_eq!(rows[1].key, text("b"));
    assert_eq!(rows[1].doc_id, b"d2");
    assert_eq!(rows[1].sequence, Sequence::new(2));

    // No single document emitted both keys: intersection is empty, union
    // holds both documents.
    let both = [text("a"), text("b")];
    let intersection: Vec<_> = MultiKeyEnumerator::new(&index, &both, SetMode::Intersection)
        .unwrap()
        .collect();
    assert!(intersection.is_empty());
    let union: Vec<_> = MultiKeyEnumerator::new(&index, &both, SetMode::Union)
        .unwrap()
        .collect();
    assert_eq!(union.len(), 2);
    assert!(union.contains(&b"d1".to_vec()));
    assert!(union.contains(&b"d2".to_vec()));
}

#[test]
fn coordinator_is_idempotent() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1), ("b", 2)]);
    let index = open(&store, "1");

    assert!(reindex(&store, &index));
    let rows = all_rows(&index);
    let count = index.row_count().unwrap();
    let last = index.last_sequence_indexed().unwrap();

    assert!(!reindex(&store, &index));
    assert_eq!(all_rows(&index), rows);
    assert_eq!(index.row_count().unwrap(), count);
    assert_eq!(index.last_sequence_indexed().unwrap(), last);
}

#[test]
fn reindexing_replaces_rather_than_merges() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1), ("b", 2)]);
    let index = open(&store, "1");
    assert!(reindex(&store, &index));

    // The document's output changes from {a, b} to {b, c}.
    put(&store, b"d1", &[("b", 2), ("c", 3)]);
    assert!(reindex(&store, &index));

    let rows = all_rows(&index);
    assert_eq!(
        rows,
        vec![
            (text("b"), b"d1".to_vec(), 2),
            (text("c"), b"d1".to_vec(), 3),
        ]
    );
    assert_eq!(index.row_count().unwrap(), 2);
}

#[test]
fn deletion_drops_all_rows_for_the_document() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1), ("b", 2)]);
    put(&store, b"d2", &[("b", 5)]);
    let index = open(&store, "1");
    assert!(reindex(&store, &index));
    assert_eq!(index.row_count().unwrap(), 3);

    delete(&store, b"d1");
    assert!(reindex(&store, &index));

    assert_eq!(index.row_count().unwrap(), 1);
    assert_eq!(all_rows(&index), vec![(text("b"), b"d2".to_vec(), 5)]);
    // The tombstone's sequence still advanced the index.
    assert_eq!(index.last_sequence_indexed().unwrap(), Sequence::new(3));
}

#[test]
fn map_version_bump_rebuilds_from_scratch() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1)]);
    {
        let index = open(&store, "1");
        assert!(reindex(&store, &index));
        assert_eq!(index.row_count().unwrap(), 1);
    }

    // New version: counters reset before the next update...
    let index = open(&store, "2");
    assert_eq!(index.last_sequence_indexed().unwrap(), Sequence::ZERO);
    assert_eq!(index.row_count().unwrap(), 0);

    // ...and the next run rebuilds the same rows under the new version.
    assert!(reindex(&store, &index));
    assert_eq!(all_rows(&index), vec![(text("a"), b"d1".to_vec(), 1)]);
    assert_eq!(index.last_sequence_indexed().unwrap(), Sequence::new(1));
}

#[test]
fn two_indexes_at_different_points_share_one_pass() {
    let store = Store::new();
    for seq in 1..=5u8 {
        put(&store, &[b'd', seq], &[("k", i64::from(seq))]);
    }

    // Both indexes catch up to sequence 5.
    let first = open(&store, "1");
    let mut second = MapIndex::open(&store, "docs.other", SRC).unwrap();
    let mut txn = store.begin();
    second.setup(&mut txn, 0, pairs_map(), "1").unwrap();
    txn.commit().unwrap();
    let mut txn = store.begin();
    assert!(Indexer::new(vec![&first, &second], &mut txn).run().unwrap());
    txn.commit().unwrap();

    // Five more documents; only the first index is brought up to 10.
    for seq in 6..=10u8 {
        put(&store, &[b'd', seq], &[("k", i64::from(seq))]);
    }
    assert!(reindex(&store, &first));
    assert_eq!(first.last_sequence_indexed().unwrap(), Sequence::new(10));
    assert_eq!(second.last_sequence_indexed().unwrap(), Sequence::new(5));
    let first_rows = all_rows(&first);

    // The shared run scans 6..=10 once: the first index ignores those
    // documents (already indexed), the second gains their rows.
    let mut txn = store.begin();
    let mut indexer = Indexer::new(vec![&first, &second], &mut txn);
    assert!(indexer.run().unwrap());
    drop(indexer);
    txn.commit().unwrap();

    assert_eq!(first.last_sequence_indexed().unwrap(), Sequence::new(10));
    assert_eq!(second.last_sequence_indexed().unwrap(), Sequence::new(10));
    assert_eq!(first.row_count().unwrap(), 10);
    assert_eq!(second.row_count().unwrap(), 10);
    assert_eq!(all_rows(&first), first_rows);
}

#[test]
fn uncommitted_run_is_invisible_to_readers() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1)]);
    let index = open(&store, "1");

    let mut txn = store.begin();
    let mut indexer = Indexer::new(vec![&index], &mut txn);
    assert!(indexer.run().unwrap());
    drop(indexer);

    // Rows staged in the open transaction are not visible to a reader.
    let rows: Vec<_> =
        QueryEnumerator::range(&index, None, None, None, None, QueryOptions::default()).collect();
    assert!(rows.is_empty());

    txn.commit().unwrap();
    assert_eq!(all_rows(&index).len(), 1);
}

#[test]
fn concurrent_readers_are_independent() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1)]);
    put(&store, b"d2", &[("b", 2)]);
    let index = open(&store, "1");
    assert!(reindex(&store, &index));

    let mut one =
        QueryEnumerator::range(&index, None, None, None, None, QueryOptions::default());
    let mut two =
        QueryEnumerator::range(&index, None, None, None, None, QueryOptions::default());

    // Interleaved advancement: each enumerator sees the full sequence.
    assert_eq!(one.next().unwrap().key, text("a"));
    assert_eq!(two.next().unwrap().key, text("a"));
    assert_eq!(one.next().unwrap().key, text("b"));
    assert_eq!(two.next().unwrap().key, text("b"));
    assert!(one.next().is_none());
    assert!(two.next().is_none());
}

#[test]
fn erase_forces_full_rebuild_on_next_run() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1)]);
    let index = open(&store, "1");
    assert!(reindex(&store, &index));

    let mut txn = store.begin();
    index.erase(&mut txn).unwrap();
    index.save_state(&mut txn).unwrap();
    txn.commit().unwrap();
    assert_eq!(index.row_count().unwrap(), 0);

    assert!(reindex(&store, &index));
    assert_eq!(all_rows(&index), vec![(text("a"), b"d1".to_vec(), 1)]);
}

#[test]
fn live_query_dirty_signal_via_changed_at() {
    let store = Store::new();
    put(&store, b"d1", &[("a", 1)]);
    let index = open(&store, "1");
    assert!(reindex(&store, &index));
    let changed_at = index.last_sequence_changed_at().unwrap();
    assert_eq!(changed_at, Sequence::new(1));

    // Rewriting the same content advances the indexed sequence but not
    // the changed-at sequence: nothing a live query shows has moved.
    put(&store, b"d1", &[("a", 1)]);
    assert!(reindex(&store, &index));
    assert_eq!(index.last_sequence_indexed().unwrap(), Sequence::new(2));
    assert_eq!(index.last_sequence_changed_at().unwrap(), Sequence::new(1));
}
