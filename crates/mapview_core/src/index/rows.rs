//! Physical layout of index records.
//!
//! One keyspace holds three kinds of records, kept disjoint by the leading
//! collation tag of their keys:
//!
//! - tag `Null` (1): the single metadata sentinel record
//! - tag `Bytes` (7): one back-index record per source document, listing
//!   the key encodings the document currently emits
//! - tag `Array` (8): the rows themselves, keyed `[emitted_key,
//!   Bytes(doc_id)]` so physical order is key-major, document-minor
//!
//! Because every row key is an array, no emitted key can collide with the
//! sentinel or a back-index record, whatever the map function produces.

use crate::error::{EngineError, EngineResult};
use mapview_collate::{encode, Reader, Tag, Value, Writer};
use mapview_storage::Sequence;

/// The reserved key of the metadata sentinel record.
pub(crate) fn state_key() -> Vec<u8> {
    encode(&Value::Null)
}

/// The key of a document's back-index record.
pub(crate) fn back_index_key(doc_id: &[u8]) -> Vec<u8> {
    encode(&Value::Bytes(doc_id.to_vec()))
}

/// Composes the physical key of one row from an already-encoded emitted
/// key and the source document ID.
pub(crate) fn row_key(encoded_key: &[u8], doc_id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(encoded_key.len() + doc_id.len() + 5);
    key.push(Tag::Array as u8);
    key.extend_from_slice(encoded_key);
    let mut writer = Writer::with_capacity(doc_id.len() + 3);
    writer.write_bytes(doc_id);
    key.extend_from_slice(writer.as_bytes());
    key.push(Tag::End as u8);
    key
}

/// The inclusive physical lower bound of the row region for keys >= the
/// given encoded key. With no key, the bound covers the whole row region.
pub(crate) fn rows_lower_bound(encoded_key: Option<&[u8]>) -> Vec<u8> {
    let mut bound = vec![Tag::Array as u8];
    if let Some(encoded) = encoded_key {
        bound.extend_from_slice(encoded);
    }
    bound
}

/// The exclusive physical upper bound of the row region for keys <= the
/// given encoded key. With no key, the bound closes the whole row region.
///
/// Encodings are prefix-free, so `[Array] ++ encoded ++ 0xFF` sits after
/// every row of `encoded` and before the first row of any greater key.
pub(crate) fn rows_upper_bound(encoded_key: Option<&[u8]>) -> Vec<u8> {
    match encoded_key {
        Some(encoded) => {
            let mut bound = Vec::with_capacity(encoded.len() + 2);
            bound.push(Tag::Array as u8);
            bound.extend_from_slice(encoded);
            bound.push(0xFF);
            bound
        }
        None => vec![Tag::Array as u8 + 1],
    }
}

/// Splits a physical row key back into (emitted key, doc ID).
pub(crate) fn decode_row_key(physical: &[u8]) -> EngineResult<(Value, Vec<u8>)> {
    let mut reader = Reader::new(physical);
    reader.begin_array()?;
    let key = reader.read_value()?;
    let doc_id = match reader.read_value()? {
        Value::Bytes(doc_id) => doc_id,
        other => {
            return Err(EngineError::corrupt_row(format!(
                "row key holds {:?} where the document ID belongs",
                other.tag()
            )))
        }
    };
    Ok((key, doc_id))
}

/// Encodes a row's stored value: the source sequence, a presence byte,
/// and the emitted value if any.
pub(crate) fn encode_row_value(sequence: Sequence, value: &Option<Value>) -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    body.extend_from_slice(&sequence.as_u64().to_be_bytes());
    match value {
        None => body.push(0),
        Some(value) => {
            body.push(1);
            body.extend_from_slice(&encode(value));
        }
    }
    body
}

/// Decodes a row's stored value into (source sequence, emitted value).
pub(crate) fn decode_row_value(body: &[u8]) -> EngineResult<(Sequence, Option<Value>)> {
    if body.len() < 9 {
        return Err(EngineError::corrupt_row("row value shorter than its header"));
    }
    let mut sequence_bytes = [0u8; 8];
    sequence_bytes.copy_from_slice(&body[..8]);
    let sequence = Sequence::new(u64::from_be_bytes(sequence_bytes));
    let value = match body[8] {
        0 => None,
        1 => Some(mapview_collate::decode(&body[9..])?),
        flag => {
            return Err(EngineError::corrupt_row(format!(
                "unknown value presence flag {flag}"
            )))
        }
    };
    Ok((sequence, value))
}

/// The value part of an encoded row body, excluding the sequence prefix.
///
/// Used for change detection: a retained row is rewritten only when this
/// part differs.
pub(crate) fn row_value_part(body: &[u8]) -> &[u8] {
    if body.len() < 8 {
        body
    } else {
        &body[8..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_regions_are_disjoint_and_ordered() {
        let sentinel = state_key();
        let back = back_index_key(b"doc");
        let row = row_key(&encode(&Value::Null), b"doc");
        assert!(sentinel < back);
        assert!(back < row);
        assert!(row < rows_upper_bound(None));
    }

    #[test]
    fn row_key_round_trip() {
        let key = Value::Array(vec![Value::Text("city".into()), Value::Int(3)]);
        let physical = row_key(&encode(&key), b"doc-7");
        let (decoded_key, doc_id) = decode_row_key(&physical).unwrap();
        assert_eq!(decoded_key, key);
        assert_eq!(doc_id, b"doc-7");
    }

    #[test]
    fn rows_sort_key_major_doc_minor() {
        let a = encode(&Value::Text("a".into()));
        let b = encode(&Value::Text("b".into()));
        assert!(row_key(&a, b"z") < row_key(&b, b"a"));
        assert!(row_key(&a, b"x") < row_key(&a, b"y"));
    }

    #[test]
    fn bounds_bracket_exactly_one_key_run(){
        let a = encode(&Value::Text("a".into()));
        let ab = encode(&Value::Text("ab".into()));
        let lower = rows_lower_bound(Some(&a));
        let upper = rows_upper_bound(Some(&a));
        assert!(lower <= row_key(&a, b""));
        assert!(row_key(&a, b"\xFF\xFF\xFF") < upper);
        assert!(upper < row_key(&ab, b""));
    }

    #[test]
    fn row_value_round_trip() {
        let body = encode_row_value(Sequence::new(12), &Some(Value::Int(5)));
        let (sequence, value) = decode_row_value(&body).unwrap();
        assert_eq!(sequence, Sequence::new(12));
        assert_eq!(value, Some(Value::Int(5)));

        let body = encode_row_value(Sequence::new(3), &None);
        let (sequence, value) = decode_row_value(&body).unwrap();
        assert_eq!(sequence, Sequence::new(3));
        assert_eq!(value, None);
    }

    #[test]
    fn value_part_ignores_sequence() {
        let v = Some(Value::Text("same".into()));
        let at_seq_1 = encode_row_value(Sequence::new(1), &v);
        let at_seq_9 = encode_row_value(Sequence::new(9), &v);
        assert_ne!(at_seq_1, at_seq_9);
        assert_eq!(row_value_part(&at_seq_1), row_value_part(&at_seq_9));
    }

    #[test]
    fn short_row_value_is_corrupt() {
        assert!(matches!(
            decode_row_value(&[0, 0, 0]),
            Err(EngineError::CorruptRow { .. })
        ));
    }
}
