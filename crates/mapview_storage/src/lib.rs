//! # MapView Storage
//!
//! Ordered, sequence-numbered key-value store for MapView.
//!
//! This crate provides the store contract the index engine builds on:
//! - Named keyspaces of ordered byte keys
//! - Monotonic per-keyspace sequence numbers and tombstones
//! - Enumeration by key range and by sequence range
//! - Staged transactions with read-your-writes and atomic commit
//!
//! The implementation is in-memory; it exists so the engine and its tests
//! run self-contained. Durability belongs to the store, not the engine,
//! and is out of scope here.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod store;
mod transaction;
mod types;

pub use document::Document;
pub use error::{StorageError, StorageResult};
pub use store::Store;
pub use transaction::Transaction;
pub use types::Sequence;
