//! Multi-denomination token amounts.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! `Coins` keeps at most one entry per denomination, never stores a zero
//! amount, and iterates in denomination order so that encodings and
//! comparisons are identical on every node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::TypesError;

/// A single denomination and amount, e.g. `1000utes`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Validate the denomination: a leading ASCII letter followed by 2 to 127
    /// characters from `[a-zA-Z0-9/:._-]`.
    pub fn validate_denom(denom: &str) -> Result<(), TypesError> {
        let mut chars = denom.chars();
        let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic());
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
        if valid_head && valid_tail && (3..=128).contains(&denom.len()) {
            Ok(())
        } else {
            Err(TypesError::InvalidDenom(denom.to_string()))
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A sorted set of coins, at most one per denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Coin>", try_from = "Vec<Coin>")]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a coin set, merging duplicate denominations and dropping zeros.
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Result<Self, TypesError> {
        let mut set = Self::new();
        for coin in coins {
            set.add(&coin)?;
        }
        Ok(set)
    }

    /// Add a single coin in place.
    pub fn add(&mut self, coin: &Coin) -> Result<(), TypesError> {
        Coin::validate_denom(&coin.denom)?;
        if coin.amount == 0 {
            return Ok(());
        }
        let entry = self.0.entry(coin.denom.clone()).or_insert(0);
        *entry = entry
            .checked_add(coin.amount)
            .ok_or_else(|| TypesError::Overflow(coin.denom.clone()))?;
        Ok(())
    }

    /// Sum of two coin sets; fails on overflow in any denomination.
    pub fn checked_add(&self, other: &Coins) -> Result<Coins, TypesError> {
        let mut sum = self.clone();
        for coin in other.iter() {
            sum.add(&coin)?;
        }
        Ok(sum)
    }

    /// Subtract `other`, failing if any denomination would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, TypesError> {
        let mut diff = self.0.clone();
        for (denom, &needed) in &other.0 {
            let available = self.amount_of(denom);
            let rest = available
                .checked_sub(needed)
                .ok_or_else(|| TypesError::Insufficient {
                    denom: denom.clone(),
                    needed,
                    available,
                })?;
            if rest == 0 {
                diff.remove(denom);
            } else {
                diff.insert(denom.clone(), rest);
            }
        }
        Ok(Coins(diff))
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when every denomination present in `threshold` is met or exceeded.
    ///
    /// Denominations held here but absent from `threshold` are ignored, and an
    /// empty threshold is always met.
    pub fn is_all_gte(&self, threshold: &Coins) -> bool {
        threshold
            .0
            .iter()
            .all(|(denom, &needed)| self.amount_of(denom) >= needed)
    }

    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(denom, &amount)| Coin::new(denom.clone(), amount))
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(coins: Coins) -> Self {
        coins.iter().collect()
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = TypesError;

    fn try_from(coins: Vec<Coin>) -> Result<Self, Self::Error> {
        Coins::from_coins(coins)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// u128 amounts travel as decimal strings so text formats without 128-bit
/// integers (TOML) can carry them.
mod amount_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>().map_err(D::Error::custom)
    }
}
