//! Account address type with `tes1` prefix.

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

type Blake2b160 = Blake2b<U20>;

/// A 20-byte account identity, rendered as `tes1` followed by 40 hex digits.
///
/// Module accounts (such as the governance authority) have no key pair; their
/// address is derived deterministically from the module name so every node
/// computes the same identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// The standard prefix for all textual addresses.
    pub const PREFIX: &'static str = "tes1";

    pub const LEN: usize = 20;

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive the account address of a named module.
    pub fn for_module(name: &str) -> Self {
        let mut hasher = Blake2b160::new();
        hasher.update(b"module/");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let body = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypesError::InvalidAddress(s.to_string()))?;
        let raw = hex::decode(body).map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; 20] = raw
            .try_into()
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
