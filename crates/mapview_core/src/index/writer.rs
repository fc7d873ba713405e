//! Per-document row replacement.

use crate::error::{EngineError, EngineResult};
use crate::index::rows;
use mapview_collate::{encode, Value};
use mapview_storage::{Sequence, Transaction};
use std::collections::{BTreeMap, BTreeSet};

/// Replaces one document's row set with its new emissions.
///
/// The writer diffs against the document's back-index record rather than
/// scanning: stale keys are erased, new keys inserted, retained keys
/// rewritten only when the value part changed. It adjusts the caller's
/// row count by insertions and removals and reports whether any row
/// changed at all.
pub(crate) struct RowWriter<'a> {
    keyspace: &'a str,
}

impl<'a> RowWriter<'a> {
    pub(crate) fn new(keyspace: &'a str) -> Self {
        Self { keyspace }
    }

    /// Replaces the row set of `doc_id` with `pairs`, emitted at
    /// `sequence`. Duplicate keys in `pairs` merge last-write-wins.
    pub(crate) fn update(
        &self,
        txn: &mut Transaction,
        doc_id: &[u8],
        sequence: Sequence,
        pairs: Vec<(Value, Option<Value>)>,
        row_count: &mut u64,
    ) -> EngineResult<bool> {
        let back_key = rows::back_index_key(doc_id);
        let old_keys = self.read_back_index(txn, &back_key)?;

        let mut new_rows: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for (key, value) in &pairs {
            new_rows.insert(encode(key), rows::encode_row_value(sequence, value));
        }

        let mut changed = false;

        for stale in old_keys.iter().filter(|k| !new_rows.contains_key(*k)) {
            txn.erase(self.keyspace, &rows::row_key(stale, doc_id))?;
            *row_count -= 1;
            changed = true;
        }

        for (encoded_key, body) in &new_rows {
            let physical = rows::row_key(encoded_key, doc_id);
            if old_keys.contains(encoded_key) {
                let existing = txn.get(self.keyspace, &physical)?;
                let unchanged = existing
                    .map(|doc| rows::row_value_part(&doc.body) == rows::row_value_part(body))
                    .unwrap_or(false);
                if !unchanged {
                    txn.set(self.keyspace, &physical, body.clone())?;
                    changed = true;
                }
            } else {
                txn.set(self.keyspace, &physical, body.clone())?;
                *row_count += 1;
                changed = true;
            }
        }

        // The back-index only tracks the key set; value-only changes leave
        // it as is.
        if !old_keys.iter().eq(new_rows.keys()) {
            if new_rows.is_empty() {
                txn.erase(self.keyspace, &back_key)?;
            } else {
                let listing = Value::Array(
                    new_rows
                        .keys()
                        .map(|k| Value::Bytes(k.clone()))
                        .collect(),
                );
                txn.set(self.keyspace, &back_key, encode(&listing))?;
            }
        }

        Ok(changed)
    }

    fn read_back_index(
        &self,
        txn: &Transaction,
        back_key: &[u8],
    ) -> EngineResult<BTreeSet<Vec<u8>>> {
        let Some(doc) = txn.get(self.keyspace, back_key)? else {
            return Ok(BTreeSet::new());
        };
        if doc.deleted {
            return Ok(BTreeSet::new());
        }
        let listing = mapview_collate::decode(&doc.body)?;
        let Value::Array(items) = listing else {
            return Err(EngineError::corrupt_row(
                "back-index record is not an array",
            ));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Bytes(key) => Ok(key),
                other => Err(EngineError::corrupt_row(format!(
                    "back-index entry holds {:?} where a key encoding belongs",
                    other.tag()
                ))),
            })
            .collect()
    }
}
