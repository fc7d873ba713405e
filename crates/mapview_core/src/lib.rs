//! # MapView Core
//!
//! Incremental map-view index engine for MapView.
//!
//! This crate provides:
//! - [`MapIndex`]: one incremental index with persisted, versioned
//!   metadata and per-document row replacement
//! - [`Indexer`]: a coordinator updating several indexes over one source
//!   keyspace in a single sequence-ordered pass
//! - [`QueryEnumerator`]: ordered range and key-set scans over committed
//!   rows
//! - [`MultiKeyEnumerator`]: document-set intersection/union over a key
//!   set
//!
//! A host registers a [`MapFn`] that projects each source document into
//! zero or more (key, value) rows; the engine keeps those rows consistent
//! with the source as documents are added, changed, and deleted, and
//! rebuilds the index automatically when the map function's declared
//! version changes.
//!
//! Everything rides on the store's transactions: row writes and metadata
//! writes staged through one transaction become visible atomically at
//! commit, and an abandoned indexing pass leaves no trace.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod index;
mod indexer;
mod mappable;
mod query;

pub use error::{EngineError, EngineResult};
pub use index::MapIndex;
pub use indexer::Indexer;
pub use mappable::{Emitter, MapFn, Mappable};
pub use query::{MultiKeyEnumerator, QueryEnumerator, QueryOptions, QueryRow, SetMode};
