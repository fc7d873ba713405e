//! Document-set queries over multiple keys.

use crate::error::EngineResult;
use crate::index::rows;
use crate::index::MapIndex;
use mapview_collate::{encode, Value};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

/// How a document's rows must cover the requested key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// A document qualifies with a row for any requested key.
    Union,
    /// A document qualifies only with a row for every requested key.
    Intersection,
}

/// Enumerates the distinct IDs of documents whose rows cover a key set.
///
/// The walk visits each requested key's contiguous row run, counting per
/// candidate document which keys it has satisfied. Union emits a document
/// at its first satisfying row (later duplicates suppressed);
/// intersection emits it the moment the last requested key is satisfied.
/// Keys absent from the index contribute nothing, which makes an
/// intersection over them unsatisfiable.
///
/// The document set is computed at construction, where store failures
/// surface as the constructor's error; iteration itself cannot fail.
pub struct MultiKeyEnumerator {
    doc_ids: std::vec::IntoIter<Vec<u8>>,
}

impl MultiKeyEnumerator {
    /// Walks the index and computes the document set for `keys` under
    /// `mode`. Duplicate keys in the request are ignored.
    pub fn new(index: &MapIndex, keys: &[Value], mode: SetMode) -> EngineResult<Self> {
        let mut requested: Vec<Vec<u8>> = Vec::with_capacity(keys.len());
        let mut seen_keys = BTreeSet::new();
        for key in keys {
            let encoded = encode(key);
            if seen_keys.insert(encoded.clone()) {
                requested.push(encoded);
            }
        }

        let store = index.store();
        let keyspace = index.name();
        let total = requested.len();
        let mut satisfied: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut doc_ids = Vec::new();

        for encoded_key in &requested {
            let lower = rows::rows_lower_bound(Some(encoded_key));
            let upper = rows::rows_upper_bound(Some(encoded_key));
            let mut cursor: Option<Vec<u8>> = None;
            loop {
                let from = match &cursor {
                    Some(position) => Bound::Excluded(position.as_slice()),
                    None => Bound::Included(lower.as_slice()),
                };
                let Some(doc) =
                    store.first_in_range(keyspace, from, Bound::Excluded(upper.as_slice()))?
                else {
                    break;
                };
                cursor = Some(doc.key.clone());
                let (_, doc_id) = rows::decode_row_key(&doc.key)?;
                match satisfied.entry(doc_id) {
                    Entry::Vacant(entry) => {
                        let doc_id = entry.key().clone();
                        entry.insert(1);
                        match mode {
                            SetMode::Union => doc_ids.push(doc_id),
                            SetMode::Intersection if total == 1 => doc_ids.push(doc_id),
                            SetMode::Intersection => {}
                        }
                    }
                    Entry::Occupied(mut entry) => {
                        *entry.get_mut() += 1;
                        if mode == SetMode::Intersection && *entry.get() == total {
                            doc_ids.push(entry.key().clone());
                        }
                    }
                }
            }
        }

        Ok(Self {
            doc_ids: doc_ids.into_iter(),
        })
    }
}

impl Iterator for MultiKeyEnumerator {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.doc_ids.next()
    }
}
