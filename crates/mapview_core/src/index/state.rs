//! Persisted index metadata.

use crate::error::EngineResult;
use mapview_collate::{Reader, Tag, Value, Writer};
use mapview_storage::Sequence;

/// Oldest persisted format this build can read.
pub(crate) const MIN_FORMAT_VERSION: i64 = 1;
/// Format written by this build.
pub(crate) const CUR_FORMAT_VERSION: i64 = 1;

/// The counters and versions persisted for one index.
///
/// Stored under the reserved sentinel key as a collatable array of, in
/// order: last sequence indexed, last sequence at which rows changed, map
/// version, index type, row count, format version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IndexState {
    pub last_sequence_indexed: Sequence,
    pub last_sequence_changed_at: Sequence,
    pub last_map_version: String,
    pub index_type: i32,
    pub row_count: u64,
}

/// Outcome of decoding a persisted state record.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StateRecord {
    /// No usable record; the index was never built.
    Absent,
    /// A record from an unsupported format; counters must be treated as
    /// zero and the rows as logically gone.
    Obsolete,
    /// A current-format record.
    Current(IndexState),
}

impl IndexState {
    /// Encodes the record body written under the sentinel key.
    #[allow(clippy::cast_possible_wrap)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write(&Value::Array(vec![
            Value::Int(self.last_sequence_indexed.as_u64() as i64),
            Value::Int(self.last_sequence_changed_at.as_u64() as i64),
            Value::Text(self.last_map_version.clone()),
            Value::Int(i64::from(self.index_type)),
            Value::Int(self.row_count as i64),
            Value::Int(CUR_FORMAT_VERSION),
        ]));
        writer.into_bytes()
    }

    /// Decodes a record body, field at a time.
    ///
    /// A record that is not an array is ignored (`Absent`). One whose
    /// array ends before the format-version field, or whose format version
    /// is below the minimum supported, is `Obsolete`: the caller resets
    /// its counters and schedules the rows for erasure. Field-level decode
    /// failures propagate; they indicate corruption, not an old format.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub(crate) fn decode(body: &[u8]) -> EngineResult<StateRecord> {
        let mut reader = Reader::new(body);
        if reader.is_empty() || reader.peek_tag()? != Tag::Array {
            return Ok(StateRecord::Absent);
        }
        reader.begin_array()?;
        let state = IndexState {
            last_sequence_indexed: Sequence::new(reader.read_int()? as u64),
            last_sequence_changed_at: Sequence::new(reader.read_int()? as u64),
            last_map_version: reader.read_str()?,
            index_type: reader.read_int()? as i32,
            row_count: reader.read_int()? as u64,
        };
        if reader.peek_tag()? == Tag::End || reader.read_int()? < MIN_FORMAT_VERSION {
            return Ok(StateRecord::Obsolete);
        }
        Ok(StateRecord::Current(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapview_collate::encode;

    fn sample() -> IndexState {
        IndexState {
            last_sequence_indexed: Sequence::new(40),
            last_sequence_changed_at: Sequence::new(38),
            last_map_version: "2".into(),
            index_type: 7,
            row_count: 12,
        }
    }

    #[test]
    fn round_trip() {
        let body = sample().encode();
        assert_eq!(IndexState::decode(&body).unwrap(), StateRecord::Current(sample()));
    }

    #[test]
    fn non_array_record_is_absent() {
        let body = encode(&Value::Int(3));
        assert_eq!(IndexState::decode(&body).unwrap(), StateRecord::Absent);
        assert_eq!(IndexState::decode(&[]).unwrap(), StateRecord::Absent);
    }

    #[test]
    fn missing_format_version_is_obsolete() {
        // A record written without the trailing format-version field.
        let body = encode(&Value::Array(vec![
            Value::Int(40),
            Value::Int(38),
            Value::Text("2".into()),
            Value::Int(7),
            Value::Int(12),
        ]));
        assert_eq!(IndexState::decode(&body).unwrap(), StateRecord::Obsolete);
    }

    #[test]
    fn old_format_version_is_obsolete() {
        let body = encode(&Value::Array(vec![
            Value::Int(40),
            Value::Int(38),
            Value::Text("2".into()),
            Value::Int(7),
            Value::Int(12),
            Value::Int(0),
        ]));
        assert_eq!(IndexState::decode(&body).unwrap(), StateRecord::Obsolete);
    }

    #[test]
    fn corrupt_field_is_an_error() {
        // Array whose first field is text where an integer belongs.
        let body = encode(&Value::Array(vec![Value::Text("x".into())]));
        assert!(IndexState::decode(&body).is_err());
    }
}
