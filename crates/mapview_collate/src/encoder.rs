//! Collatable encoder.

use crate::value::{Tag, Value};

/// Encode a value to collatable bytes.
///
/// The output is self-delimiting and prefix-free, and byte-lexicographic
/// comparison of two encodings equals [`Value`]'s own ordering. Encoding
/// cannot fail.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write(value);
    writer.into_bytes()
}

/// An incremental collatable encoder.
///
/// Successive `write` calls append independent value encodings; callers
/// composing structural keys by hand can also append raw tag bytes via the
/// buffer returned by [`Writer::into_bytes`].
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value.
    pub fn write(&mut self, value: &Value) {
        match value {
            Value::Null => self.buffer.push(Tag::Null as u8),
            Value::Bool(b) => self.write_bool(*b),
            Value::Int(n) => self.write_int(*n),
            Value::Text(s) => self.write_str(s),
            Value::Bytes(b) => self.write_bytes(b),
            Value::Array(items) => self.write_array(items),
        }
    }

    /// Encode a boolean.
    pub fn write_bool(&mut self, b: bool) {
        self.buffer
            .push(if b { Tag::True as u8 } else { Tag::False as u8 });
    }

    /// Encode an integer.
    ///
    /// Non-negative values encode as a length byte followed by the
    /// big-endian magnitude without leading zeros, so shorter encodings are
    /// smaller values. Negative values encode the complement of the
    /// magnitude of `-(n+1)` with an inverted length byte, so more negative
    /// values sort first.
    #[allow(clippy::cast_sign_loss)]
    pub fn write_int(&mut self, n: i64) {
        if n >= 0 {
            let magnitude = n as u64;
            let len = significant_len(magnitude);
            self.buffer.push(Tag::PosInt as u8);
            self.buffer.push(len);
            self.buffer
                .extend_from_slice(&magnitude.to_be_bytes()[8 - len as usize..]);
        } else {
            // !n == -(n+1) for two's complement i64
            let magnitude = !n as u64;
            let len = significant_len(magnitude);
            self.buffer.push(Tag::NegInt as u8);
            self.buffer.push(0xFF - len);
            for byte in &magnitude.to_be_bytes()[8 - len as usize..] {
                self.buffer.push(!byte);
            }
        }
    }

    /// Encode a text string.
    pub fn write_str(&mut self, s: &str) {
        self.buffer.push(Tag::Text as u8);
        self.write_escaped(s.as_bytes());
    }

    /// Encode a byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.push(Tag::Bytes as u8);
        self.write_escaped(bytes);
    }

    fn write_array(&mut self, items: &[Value]) {
        self.buffer.push(Tag::Array as u8);
        for item in items {
            self.write(item);
        }
        self.buffer.push(Tag::End as u8);
    }

    // 0x00 content bytes become 0x00 0xFF; the terminator is 0x00 0x00.
    // This keeps byte-lexicographic order identical to the raw content's.
    fn write_escaped(&mut self, content: &[u8]) {
        for &byte in content {
            self.buffer.push(byte);
            if byte == 0x00 {
                self.buffer.push(0xFF);
            }
        }
        self.buffer.push(0x00);
        self.buffer.push(0x00);
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

fn significant_len(magnitude: u64) -> u8 {
    ((64 - magnitude.leading_zeros()).div_ceil(8)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_null_and_bools() {
        assert_eq!(encode(&Value::Null), vec![0x01]);
        assert_eq!(encode(&Value::Bool(false)), vec![0x02]);
        assert_eq!(encode(&Value::Bool(true)), vec![0x03]);
    }

    #[test]
    fn encode_non_negative_integers() {
        assert_eq!(encode(&Value::Int(0)), vec![0x05, 0x00]);
        assert_eq!(encode(&Value::Int(1)), vec![0x05, 0x01, 0x01]);
        assert_eq!(encode(&Value::Int(255)), vec![0x05, 0x01, 0xFF]);
        assert_eq!(encode(&Value::Int(256)), vec![0x05, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn encode_negative_integers() {
        // -1 has magnitude 0 and no magnitude bytes
        assert_eq!(encode(&Value::Int(-1)), vec![0x04, 0xFF]);
        // -2 -> magnitude 1 -> complemented 0xFE
        assert_eq!(encode(&Value::Int(-2)), vec![0x04, 0xFE, 0xFE]);
        // -256 -> magnitude 255 -> complemented 0x00
        assert_eq!(encode(&Value::Int(-256)), vec![0x04, 0xFE, 0x00]);
        // -257 -> magnitude 256, two bytes
        assert_eq!(encode(&Value::Int(-257)), vec![0x04, 0xFD, 0xFE, 0xFF]);
    }

    #[test]
    fn encode_text() {
        assert_eq!(encode(&Value::Text("".into())), vec![0x06, 0x00, 0x00]);
        assert_eq!(
            encode(&Value::Text("ab".into())),
            vec![0x06, b'a', b'b', 0x00, 0x00]
        );
    }

    #[test]
    fn encode_text_with_embedded_zero() {
        assert_eq!(
            encode(&Value::Text("a\u{0}b".into())),
            vec![0x06, b'a', 0x00, 0xFF, b'b', 0x00, 0x00]
        );
    }

    #[test]
    fn encode_bytes() {
        assert_eq!(
            encode(&Value::Bytes(vec![0x01, 0x00])),
            vec![0x07, 0x01, 0x00, 0xFF, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_array() {
        assert_eq!(encode(&Value::Array(vec![])), vec![0x08, 0x00]);
        assert_eq!(
            encode(&Value::Array(vec![Value::Int(1), Value::Null])),
            vec![0x08, 0x05, 0x01, 0x01, 0x01, 0x00]
        );
    }

    #[test]
    fn byte_order_matches_value_order() {
        let samples = [
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::Int(i64::MIN),
            Value::Int(-257),
            Value::Int(-256),
            Value::Int(-2),
            Value::Int(-1),
            Value::Int(0),
            Value::Int(1),
            Value::Int(255),
            Value::Int(256),
            Value::Int(i64::MAX),
            Value::Text("".into()),
            Value::Text("a".into()),
            Value::Text("a\u{0}".into()),
            Value::Text("ab".into()),
            Value::Text("b".into()),
            Value::Bytes(vec![]),
            Value::Bytes(vec![0x00]),
            Value::Bytes(vec![0x01]),
            Value::Array(vec![]),
            Value::Array(vec![Value::Int(0)]),
            Value::Array(vec![Value::Int(0), Value::Int(0)]),
            Value::Array(vec![Value::Int(1)]),
        ];
        for pair in samples.windows(2) {
            assert!(
                encode(&pair[0]) < encode(&pair[1]),
                "encoding of {:?} should sort before {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn encodings_are_prefix_free() {
        let samples = [
            Value::Text("a".into()),
            Value::Text("ab".into()),
            Value::Array(vec![Value::Int(1)]),
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Int(0),
            Value::Int(1),
        ];
        for a in &samples {
            for b in &samples {
                if a != b {
                    let ea = encode(a);
                    let eb = encode(b);
                    assert!(!eb.starts_with(&ea), "{:?} prefixes {:?}", a, b);
                }
            }
        }
    }
}
