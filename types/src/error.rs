//! Top-level error type shared across crates.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid denomination: {0:?}")]
    InvalidDenom(String),

    #[error("amount overflow for denomination {0}")]
    Overflow(String),

    #[error("insufficient {denom}: need {needed}, have {available}")]
    Insufficient {
        denom: String,
        needed: u128,
        available: u128,
    },
}
