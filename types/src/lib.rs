//! Fundamental types for the Tessera governance core.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account addresses, multi-denomination amounts, and block timestamps.

pub mod address;
pub mod amount;
pub mod error;
pub mod time;

pub use address::Address;
pub use amount::{Coin, Coins};
pub use error::TypesError;
pub use time::Timestamp;
