//! Map function surface: mappable documents and the emitter.

use mapview_collate::{CollateResult, Value};
use mapview_storage::{Document, Sequence};

/// A map function projecting one source document into index rows.
///
/// Map functions must be pure functions of the document's content and the
/// version string declared at setup: same document, same emissions. They
/// must not read back from the index they feed. Emitting `Value::Null` as
/// a top-level key is not allowed (the engine reserves it for its own
/// metadata).
///
/// The trait is blanket-implemented for closures, so a plain
/// `|doc, emit| ...` can be registered directly.
pub trait MapFn: Send + Sync {
    /// Projects `doc`, calling `emit` for each produced row.
    fn map(&self, doc: &Mappable, emit: &mut Emitter);
}

impl<F> MapFn for F
where
    F: Fn(&Mappable, &mut Emitter) + Send + Sync,
{
    fn map(&self, doc: &Mappable, emit: &mut Emitter) {
        self(doc, emit)
    }
}

/// A source document wrapped for consumption by a map function.
///
/// The wrapper keeps map functions independent of the storage
/// representation: they see an ID, a sequence, a tombstone flag, and the
/// opaque body, plus a convenience decoder for collatable-encoded bodies.
#[derive(Debug, Clone)]
pub struct Mappable {
    document: Document,
}

impl Mappable {
    /// Wraps a source document.
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The source document's ID (opaque bytes).
    pub fn doc_id(&self) -> &[u8] {
        &self.document.key
    }

    /// The source document's sequence number.
    pub fn sequence(&self) -> Sequence {
        self.document.sequence
    }

    /// Whether the document is a tombstone.
    pub fn deleted(&self) -> bool {
        self.document.deleted
    }

    /// The raw document body.
    pub fn body(&self) -> &[u8] {
        &self.document.body
    }

    /// Decodes the body as a collatable value.
    ///
    /// Hosts that store collatable-encoded bodies can use this instead of
    /// decoding by hand; others read [`Mappable::body`] directly.
    pub fn decode_body(&self) -> CollateResult<Value> {
        mapview_collate::decode(&self.document.body)
    }
}

/// Collects the rows a map function emits for one document.
///
/// Emissions are kept in emission order, duplicates included; the row
/// writer later merges duplicate keys last-write-wins. A value of `None`
/// is the "no value" sentinel and is distinct from not emitting the key.
#[derive(Debug, Default)]
pub struct Emitter {
    pairs: Vec<(Value, Option<Value>)>,
}

impl Emitter {
    /// Creates an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one (key, value) row for the current document.
    pub fn emit(&mut self, key: Value, value: Option<Value>) {
        self.pairs.push((key, value));
    }

    /// Number of emissions so far.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Consumes the emitter, returning the emissions in order.
    pub(crate) fn into_pairs(self) -> Vec<(Value, Option<Value>)> {
        self.pairs
    }
}
