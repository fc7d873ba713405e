//! # MapView Collate
//!
//! Order-preserving typed binary encoding for MapView.
//!
//! This crate provides the "collatable" codec used for index keys and
//! persisted engine state:
//! - Byte-lexicographic comparison of encodings equals logical comparison
//!   of the encoded values
//! - Encodings are self-delimiting, prefix-free, and losslessly reversible
//! - Type precedence: null < false < true < negative integer < positive
//!   integer < text < bytes < array
//!
//! ## Usage
//!
//! ```
//! use mapview_collate::{decode, encode, Value};
//!
//! let value = Value::Array(vec![Value::Text("age".into()), Value::Int(30)]);
//! let bytes = encode(&value);
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```
//!
//! The `Null` encoding is reserved: the index engine stores its metadata
//! under that key, and map functions must not emit `Null` as a top-level
//! key. This is a documented invariant of the codec, not a runtime check.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{decode, Reader};
pub use encoder::{encode, Writer};
pub use error::{CollateError, CollateResult};
pub use value::{Tag, Value};
