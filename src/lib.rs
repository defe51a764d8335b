//! # ca-cache
//!
//! Generic cache-aside access layer for SQL-backed, key-indexed record
//! storages.
//!
//! Think of it as an L1 read cache sitting between your application code and
//! a relational table: a concurrent key-to-record map, populated on demand or in
//! bulk and kept warm for subsequent reads.
//!
//! # The Basics
//!
//! The `ca-cache` crate is designed for the following use case:
//!
//! - Key-indexed, record-based storage; i.e. a database table with a key
//!   column.
//! - Read-mostly access where repeated lookups dominate and round trips to
//!   the backend hurt.
//! - Decoding of a row into a domain value is supplied by the caller.
//!
//! The cache operates on the following principles:
//!
//! - One [`TableCache`] per table, constructed once with fixed metadata
//!   (table name, column list, key column) and a pluggable row decoder.
//! - Four population strategies: single key, key batch, the whole table, or
//!   an arbitrary query of the same row shape.
//! - Implemented over the [moka](https://crates.io/crates/moka) concurrent
//!   cache, built unbounded: entries never expire and are only removed by
//!   explicit deletion.
//! - Fully async; the backend is driven through
//!   [SeaORM](https://crates.io/crates/sea-orm)'s raw-query interface, so any
//!   of its connection kinds will do.
//! - As an "L1" cache, it doesn't support distributed caching, and it does
//!   not deduplicate concurrent loads of the same missing key: each miss
//!   queries on its own and the last write wins.
//!
//! # Partial failure
//!
//! Bulk loads degrade gracefully: a row the decoder rejects is dropped while
//! the remaining rows are still decoded and cached, and only the first decode
//! failure is reported. Batch retrieval returns every record it could
//! resolve next to at most one error; an unresolved identifier is simply
//! absent from the result, indistinguishable from "will resolve on a future
//! call". Check for the keys you expect.

pub mod cache;
pub mod traits;
pub mod types;

#[doc(inline)]
pub use cache::TableCache;
#[doc(inline)]
pub use traits::Record;

pub mod prelude {
    pub use crate::cache::TableCache;
    pub use crate::traits::Record;
    pub use crate::types::*;
}
