//! Governance parameters.
//!
//! Params are loaded from the `[params]` table of the config file at genesis
//! and persisted in the store under [`PARAMS_KEY`] so every node reads the
//! same values while processing a block.

use serde::{Deserialize, Serialize};

use tessera_store::{KvRead, KvWrite};
use tessera_types::{Coin, Coins};

use crate::codec;
use crate::error::{ConsistencyFault, GovernanceError};
use crate::keys::PARAMS_KEY;

pub const DEFAULT_DENOM: &str = "utes";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovParams {
    /// How long a proposal may collect deposits.
    #[serde(default = "default_deposit_period_secs")]
    pub deposit_period_secs: u64,

    #[serde(default = "default_voting_period_secs")]
    pub voting_period_secs: u64,

    /// Byte limit applied to each of metadata, title and summary.
    #[serde(default = "default_max_metadata_len")]
    pub max_metadata_len: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Deposit needed to enter the voting period.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: Coins,

    /// Deposit at which an activated proposal is fast-tracked.
    #[serde(default = "default_emergency_min_deposit")]
    pub emergency_min_deposit: Coins,
}

fn default_deposit_period_secs() -> u64 {
    2 * 24 * 3600
}

fn default_voting_period_secs() -> u64 {
    2 * 24 * 3600
}

fn default_max_metadata_len() -> u64 {
    255
}

fn default_page_size() -> u64 {
    100
}

fn default_max_page_size() -> u64 {
    1000
}

fn default_min_deposit() -> Coins {
    Coins::from_coins([Coin::new(DEFAULT_DENOM, 10_000_000)]).unwrap_or_default()
}

fn default_emergency_min_deposit() -> Coins {
    Coins::from_coins([Coin::new(DEFAULT_DENOM, 100_000_000)]).unwrap_or_default()
}

impl Default for GovParams {
    fn default() -> Self {
        Self {
            deposit_period_secs: default_deposit_period_secs(),
            voting_period_secs: default_voting_period_secs(),
            max_metadata_len: default_max_metadata_len(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            min_deposit: default_min_deposit(),
            emergency_min_deposit: default_emergency_min_deposit(),
        }
    }
}

impl GovParams {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.deposit_period_secs == 0 {
            return Err(invalid("deposit period must be positive"));
        }
        if self.voting_period_secs == 0 {
            return Err(invalid("voting period must be positive"));
        }
        if self.min_deposit.is_empty() {
            return Err(invalid("min deposit cannot be empty"));
        }
        if self.emergency_min_deposit.is_empty() {
            return Err(invalid("emergency min deposit cannot be empty"));
        }
        if !self.emergency_min_deposit.is_all_gte(&self.min_deposit) {
            return Err(invalid(format!(
                "emergency min deposit {} is below min deposit {}",
                self.emergency_min_deposit, self.min_deposit
            )));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(invalid("page sizes must be positive"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(invalid(format!(
                "default page size {} exceeds max page size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> GovernanceError {
    GovernanceError::InvalidParams(reason.into())
}

/// Read the stored params. Missing params mean genesis never ran.
pub fn load(store: &dyn KvRead) -> Result<GovParams, GovernanceError> {
    let bytes = store
        .get(PARAMS_KEY)?
        .ok_or(ConsistencyFault::MissingParams)?;
    Ok(codec::decode_params(&bytes)?)
}

pub fn save(store: &mut dyn KvWrite, params: &GovParams) -> Result<(), GovernanceError> {
    params.validate()?;
    store.set(PARAMS_KEY, &codec::encode_params(params)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(amount: u128) -> Coins {
        Coins::from_coins([Coin::new(DEFAULT_DENOM, amount)]).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        GovParams::default().validate().unwrap();
    }

    #[test]
    fn zero_periods_are_rejected() {
        let params = GovParams {
            voting_period_secs: 0,
            ..GovParams::default()
        };
        assert!(matches!(params.validate(), Err(GovernanceError::InvalidParams(_))));

        let params = GovParams {
            deposit_period_secs: 0,
            ..GovParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn emergency_threshold_must_cover_min_deposit() {
        let params = GovParams {
            min_deposit: coins(100),
            emergency_min_deposit: coins(99),
            ..GovParams::default()
        };
        assert!(params.validate().is_err());

        let params = GovParams {
            min_deposit: coins(100),
            emergency_min_deposit: coins(100),
            ..GovParams::default()
        };
        params.validate().unwrap();
    }

    #[test]
    fn default_page_size_cannot_exceed_max() {
        let params = GovParams {
            default_page_size: 50,
            max_page_size: 10,
            ..GovParams::default()
        };
        assert!(params.validate().is_err());
    }
}
