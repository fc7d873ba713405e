//! Query enumerators over committed index rows.

mod multikey;
mod range;

pub use multikey::{MultiKeyEnumerator, SetMode};
pub use range::{QueryEnumerator, QueryOptions, QueryRow};
