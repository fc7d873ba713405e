//! Collatable decoder.

use crate::error::{CollateError, CollateResult};
use crate::value::{Tag, Value};

/// Decode a single value from collatable bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid encoding or if input
/// remains after the value.
pub fn decode(bytes: &[u8]) -> CollateResult<Value> {
    let mut reader = Reader::new(bytes);
    let value = reader.read_value()?;
    if !reader.is_empty() {
        return Err(CollateError::TrailingData);
    }
    Ok(value)
}

/// An incremental collatable decoder.
///
/// Values are self-delimiting, so a reader can pull typed fields one at a
/// time from a concatenated sequence. This is the shape used for decoding
/// persisted index state, where a record may end early and the caller
/// inspects [`Reader::peek_tag`] before each field.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The tag of the next value, without consuming it.
    pub fn peek_tag(&self) -> CollateResult<Tag> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CollateError::UnexpectedEnd)?;
        Tag::from_byte(byte).ok_or(CollateError::InvalidTag {
            tag: byte,
            offset: self.pos,
        })
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Decode the next value of any type.
    pub fn read_value(&mut self) -> CollateResult<Value> {
        match self.peek_tag()? {
            Tag::End => Err(CollateError::InvalidTag {
                tag: Tag::End as u8,
                offset: self.pos,
            }),
            Tag::Null => {
                self.pos += 1;
                Ok(Value::Null)
            }
            Tag::False => {
                self.pos += 1;
                Ok(Value::Bool(false))
            }
            Tag::True => {
                self.pos += 1;
                Ok(Value::Bool(true))
            }
            Tag::NegInt | Tag::PosInt => self.read_int().map(Value::Int),
            Tag::Text => self.read_str().map(Value::Text),
            Tag::Bytes => {
                self.pos += 1;
                self.read_escaped().map(Value::Bytes)
            }
            Tag::Array => {
                self.begin_array()?;
                let mut items = Vec::new();
                while self.peek_tag()? != Tag::End {
                    items.push(self.read_value()?);
                }
                self.pos += 1; // consume the terminator
                Ok(Value::Array(items))
            }
        }
    }

    /// Decode the next value, which must be an integer.
    pub fn read_int(&mut self) -> CollateResult<i64> {
        let start = self.pos;
        match self.peek_tag()? {
            Tag::PosInt => {
                self.pos += 1;
                let len = self.read_byte()?;
                let magnitude = self.read_magnitude(len, start, false)?;
                i64::try_from(magnitude)
                    .map_err(|_| CollateError::IntOutOfRange { offset: start })
            }
            Tag::NegInt => {
                self.pos += 1;
                let len = 0xFF - self.read_byte()?;
                let magnitude = self.read_magnitude(len, start, true)?;
                let magnitude = i64::try_from(magnitude)
                    .map_err(|_| CollateError::IntOutOfRange { offset: start })?;
                Ok(-magnitude - 1)
            }
            _ => Err(CollateError::UnexpectedTag {
                expected: "integer",
                offset: start,
            }),
        }
    }

    /// Decode the next value, which must be a text string.
    pub fn read_str(&mut self) -> CollateResult<String> {
        if self.peek_tag()? != Tag::Text {
            return Err(CollateError::UnexpectedTag {
                expected: "text",
                offset: self.pos,
            });
        }
        self.pos += 1;
        let bytes = self.read_escaped()?;
        String::from_utf8(bytes).map_err(|_| CollateError::InvalidUtf8)
    }

    /// Consume the opening tag of an array.
    pub fn begin_array(&mut self) -> CollateResult<()> {
        if self.peek_tag()? != Tag::Array {
            return Err(CollateError::UnexpectedTag {
                expected: "array",
                offset: self.pos,
            });
        }
        self.pos += 1;
        Ok(())
    }

    #[inline]
    fn read_byte(&mut self) -> CollateResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CollateError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_magnitude(&mut self, len: u8, start: usize, complement: bool) -> CollateResult<u64> {
        if len > 8 {
            return Err(CollateError::IntOutOfRange { offset: start });
        }
        let mut magnitude = 0u64;
        for _ in 0..len {
            let byte = self.read_byte()?;
            let byte = if complement { !byte } else { byte };
            magnitude = (magnitude << 8) | u64::from(byte);
        }
        Ok(magnitude)
    }

    fn read_escaped(&mut self) -> CollateResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let byte = self.read_byte()?;
            if byte != 0x00 {
                out.push(byte);
                continue;
            }
            let escape_offset = self.pos;
            match self.read_byte()? {
                0x00 => return Ok(out),
                0xFF => out.push(0x00),
                _ => return Err(CollateError::BadEscape { offset: escape_offset }),
            }
        }
    }
}
