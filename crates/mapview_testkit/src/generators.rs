//! Property-based test generators using proptest.
//!
//! Provides strategies for generating collatable values and document
//! batches that maintain required invariants.

use mapview_collate::Value;
use proptest::prelude::*;

/// Strategy for generating arbitrary collatable values, arrays included.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::Array)
    })
}

/// Strategy for generating scalar collatable values only.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        ".{0,16}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating keys a map function is allowed to emit at top
/// level (anything but null).
pub fn emitted_key_strategy() -> impl Strategy<Value = Value> {
    value_strategy().prop_filter("top-level null keys are reserved", |v| !v.is_null())
}

/// Strategy for generating document IDs.
pub fn doc_id_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..24)
}

/// Strategy for a batch of distinct documents, each carrying the values
/// its map function should emit as keys.
pub fn document_batch_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<Value>)>> {
    prop::collection::btree_map(
        doc_id_strategy(),
        prop::collection::vec(emitted_key_strategy(), 0..4),
        0..8,
    )
    .prop_map(|batch| batch.into_iter().collect())
}
