//! Governance configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tessera_utils::LogFormat;

use crate::error::GovernanceError;
use crate::params::GovParams;

/// Configuration for a governance host process.
///
/// Can be loaded from a TOML file via [`GovConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). The `[params]` table seeds genesis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub params: GovParams,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/governance")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GovConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernanceError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        let config: Self = toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))?;
        config.params.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// LMDB map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// Install the global tracing subscriber described by this config.
    pub fn init_logging(&self) {
        tessera_utils::init_logging(self.log_format, &self.log_level);
    }
}

impl Default for GovConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            params: GovParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{Coin, Coins};

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = GovConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = GovConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.params, config.params);
        assert_eq!(parsed.map_size_mb, config.map_size_mb);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = GovConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.params, GovParams::default());
    }

    #[test]
    fn params_table_overrides() {
        let toml = r#"
            log_format = "json"

            [params]
            deposit_period_secs = 50
            voting_period_secs = 100
            min_deposit = [{ denom = "utes", amount = "1000" }]
            emergency_min_deposit = [{ denom = "utes", amount = "5000" }]
        "#;
        let config = GovConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.params.deposit_period_secs, 50);
        assert_eq!(
            config.params.min_deposit,
            Coins::from_coins([Coin::new("utes", 1000)]).unwrap()
        );
        assert_eq!(config.params.max_metadata_len, 255); // default
    }

    #[test]
    fn invalid_params_are_rejected_at_load() {
        let toml = r#"
            [params]
            voting_period_secs = 0
        "#;
        let err = GovConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidParams(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = GovConfig::from_toml_file("/nonexistent/tessera.toml").unwrap_err();
        assert!(matches!(err, GovernanceError::Config(_)));
    }
}
