//! Ordered range and key-set scans over committed index rows.

use crate::error::{EngineError, EngineResult};
use crate::index::rows;
use crate::index::MapIndex;
use mapview_collate::{encode, Value};
use mapview_storage::{Document, Sequence, Store};
use std::cmp::Ordering;
use std::ops::Bound;

/// Options shared by the query enumerators.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Number of matching rows to drop before the first one returned.
    pub skip: u64,
    /// Maximum number of rows to return; `None` is unlimited.
    pub limit: Option<u64>,
    /// Visit rows in reverse collation order. Range endpoints keep their
    /// meaning: `start` is the low end of the range either way.
    pub descending: bool,
    /// Whether rows equal to the start endpoint are included.
    pub inclusive_start: bool,
    /// Whether rows equal to the end endpoint are included.
    pub inclusive_end: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: None,
            descending: false,
            inclusive_start: true,
            inclusive_end: true,
        }
    }
}

/// One row produced by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    /// The emitted key.
    pub key: Value,
    /// The emitted value, if the map function supplied one.
    pub value: Option<Value>,
    /// ID of the source document that emitted the row.
    pub doc_id: Vec<u8>,
    /// Source sequence at which the row was last written.
    pub sequence: Sequence,
}

/// A range endpoint: a key, optionally pinned to a document ID.
///
/// Without a document ID the endpoint covers every row of its key, so an
/// exclusive bound drops the whole key.
struct Endpoint {
    key: Value,
    doc_id: Option<Vec<u8>>,
}

/// A physical cursor over one contiguous slice of the row region.
struct Run {
    /// Inclusive physical lower bound.
    lower: Vec<u8>,
    /// Exclusive physical upper bound.
    upper: Vec<u8>,
    /// Physical key of the last row returned.
    cursor: Option<Vec<u8>>,
}

impl Run {
    fn over_keys(start: Option<&[u8]>, end: Option<&[u8]>) -> Self {
        Self {
            lower: rows::rows_lower_bound(start),
            upper: rows::rows_upper_bound(end),
            cursor: None,
        }
    }

    fn single_key(encoded: &[u8]) -> Self {
        Self::over_keys(Some(encoded), Some(encoded))
    }

    fn next(
        &mut self,
        store: &Store,
        keyspace: &str,
        descending: bool,
    ) -> EngineResult<Option<Document>> {
        let doc = if descending {
            let upper = match &self.cursor {
                Some(cursor) => Bound::Excluded(cursor.as_slice()),
                None => Bound::Excluded(self.upper.as_slice()),
            };
            store.last_in_range(keyspace, Bound::Included(self.lower.as_slice()), upper)?
        } else {
            let lower = match &self.cursor {
                Some(cursor) => Bound::Excluded(cursor.as_slice()),
                None => Bound::Included(self.lower.as_slice()),
            };
            store.first_in_range(keyspace, lower, Bound::Excluded(self.upper.as_slice()))?
        };
        if let Some(doc) = &doc {
            self.cursor = Some(doc.key.clone());
        }
        Ok(doc)
    }
}

enum Mode {
    Range {
        start: Option<Endpoint>,
        end: Option<Endpoint>,
        run: Run,
    },
    Keys {
        pending: std::vec::IntoIter<Value>,
        run: Option<Run>,
    },
}

enum Step {
    Row(QueryRow),
    Skip,
    Finished,
}

/// Lazy, forward-only, single-pass enumerator over an index's committed
/// rows.
///
/// Constructed either over a closed key range (see
/// [`QueryEnumerator::range`]) or over an explicit key sequence visited in
/// the caller's order (see [`QueryEnumerator::keys`]). Once exhausted it
/// stays exhausted; construct a new enumerator to restart. A store read
/// failure or an undecodable row halts iteration and is retrievable from
/// [`QueryEnumerator::error`].
pub struct QueryEnumerator {
    store: Store,
    keyspace: String,
    options: QueryOptions,
    mode: Mode,
    error: Option<EngineError>,
    done: bool,
    skipped: u64,
    emitted: u64,
}

impl QueryEnumerator {
    /// Creates an enumerator over the closed range
    /// `[start_key/start_doc_id, end_key/end_doc_id]` in collation order.
    ///
    /// `None` keys mean unbounded in that direction; a document ID without
    /// its key is ignored. With `descending` set, rows arrive from the
    /// high end first, but `start` remains the low endpoint.
    pub fn range(
        index: &MapIndex,
        start_key: Option<Value>,
        start_doc_id: Option<&[u8]>,
        end_key: Option<Value>,
        end_doc_id: Option<&[u8]>,
        options: QueryOptions,
    ) -> QueryEnumerator {
        let start_encoded = start_key.as_ref().map(encode);
        let end_encoded = end_key.as_ref().map(encode);
        let run = Run::over_keys(start_encoded.as_deref(), end_encoded.as_deref());
        let start = start_key.map(|key| Endpoint {
            key,
            doc_id: start_doc_id.map(<[u8]>::to_vec),
        });
        let end = end_key.map(|key| Endpoint {
            key,
            doc_id: end_doc_id.map(<[u8]>::to_vec),
        });
        QueryEnumerator {
            store: index.store().clone(),
            keyspace: index.name().to_string(),
            options,
            mode: Mode::Range { start, end, run },
            error: None,
            done: false,
            skipped: 0,
            emitted: 0,
        }
    }

    /// Creates an enumerator visiting the given keys in their given order
    /// (not necessarily the index's natural order). Each key may match
    /// zero or more rows. Bound flags in `options` do not apply;
    /// skip/limit/descending do.
    pub fn keys(index: &MapIndex, keys: Vec<Value>, options: QueryOptions) -> QueryEnumerator {
        QueryEnumerator {
            store: index.store().clone(),
            keyspace: index.name().to_string(),
            options,
            mode: Mode::Keys {
                pending: keys.into_iter(),
                run: None,
            },
            error: None,
            done: false,
            skipped: 0,
            emitted: 0,
        }
    }

    /// The error that halted iteration, if one occurred.
    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    fn next_row(&mut self) -> Option<QueryRow> {
        while !self.done {
            match self.advance() {
                Ok(Step::Row(row)) => {
                    if self.skipped < self.options.skip {
                        self.skipped += 1;
                        continue;
                    }
                    if let Some(limit) = self.options.limit {
                        if self.emitted >= limit {
                            self.done = true;
                            return None;
                        }
                    }
                    self.emitted += 1;
                    return Some(row);
                }
                Ok(Step::Skip) => continue,
                Ok(Step::Finished) => {
                    self.done = true;
                    return None;
                }
                Err(error) => {
                    self.error = Some(error);
                    self.done = true;
                    return None;
                }
            }
        }
        None
    }

    fn advance(&mut self) -> EngineResult<Step> {
        let descending = self.options.descending;
        match &mut self.mode {
            Mode::Range { start, end, run } => {
                let Some(doc) = run.next(&self.store, &self.keyspace, descending)? else {
                    return Ok(Step::Finished);
                };
                let (key, doc_id) = rows::decode_row_key(&doc.key)?;
                let (sequence, value) = rows::decode_row_value(&doc.body)?;
                // The physical bounds are key-granular; rows excluded by a
                // document-ID pin or an exclusive flag sit at the scan
                // head (skip) or past its tail (finish).
                if descending {
                    if !within_end(&key, &doc_id, end.as_ref(), self.options.inclusive_end) {
                        return Ok(Step::Skip);
                    }
                    if !within_start(&key, &doc_id, start.as_ref(), self.options.inclusive_start) {
                        return Ok(Step::Finished);
                    }
                } else {
                    if !within_start(&key, &doc_id, start.as_ref(), self.options.inclusive_start) {
                        return Ok(Step::Skip);
                    }
                    if !within_end(&key, &doc_id, end.as_ref(), self.options.inclusive_end) {
                        return Ok(Step::Finished);
                    }
                }
                Ok(Step::Row(QueryRow {
                    key,
                    value,
                    doc_id,
                    sequence,
                }))
            }
            Mode::Keys { pending, run } => loop {
                if let Some(current) = run.as_mut() {
                    match current.next(&self.store, &self.keyspace, descending)? {
                        Some(doc) => {
                            let (key, doc_id) = rows::decode_row_key(&doc.key)?;
                            let (sequence, value) = rows::decode_row_value(&doc.body)?;
                            return Ok(Step::Row(QueryRow {
                                key,
                                value,
                                doc_id,
                                sequence,
                            }));
                        }
                        None => *run = None,
                    }
                } else if let Some(key) = pending.next() {
                    *run = Some(Run::single_key(&encode(&key)));
                } else {
                    return Ok(Step::Finished);
                }
            },
        }
    }
}

impl Iterator for QueryEnumerator {
    type Item = QueryRow;

    fn next(&mut self) -> Option<QueryRow> {
        self.next_row()
    }
}

/// Whether a row sits at or after the range's low endpoint.
fn within_start(key: &Value, doc_id: &[u8], start: Option<&Endpoint>, inclusive: bool) -> bool {
    let Some(endpoint) = start else { return true };
    match key.cmp(&endpoint.key) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match &endpoint.doc_id {
            None => inclusive,
            Some(pin) => match doc_id.cmp(pin.as_slice()) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => inclusive,
            },
        },
    }
}

/// Whether a row sits at or before the range's high endpoint.
fn within_end(key: &Value, doc_id: &[u8], end: Option<&Endpoint>, inclusive: bool) -> bool {
    let Some(endpoint) = end else { return true };
    match key.cmp(&endpoint.key) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => match &endpoint.doc_id {
            None => inclusive,
            Some(pin) => match doc_id.cmp(pin.as_slice()) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => inclusive,
            },
        },
    }
}
