//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies (block clock, storage) are abstracted behind traits.
//! This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap the LMDB backend and real block headers for nullables in tests.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullKvStore;
