//! Abstract storage contract for the Tessera governance core.
//!
//! Every storage backend (LMDB, in-memory for testing) implements [`KvRead`]
//! and [`KvWrite`]. The rest of the codebase depends only on these traits.
//!
//! Units of work are layered with [`CacheKv`]: writes land in an overlay and
//! reach the parent store only when the overlay's [`Changeset`] is applied.
//! Dropping an overlay discards everything written through it.

pub mod cache;
pub mod error;
pub mod kv;

pub use cache::{atomically, CacheKv, Changeset};
pub use error::StoreError;
pub use kv::{prefix_end, range_is_empty, KvRead, KvWrite, Visit};
