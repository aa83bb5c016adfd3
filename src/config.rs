//! Configuration loading
//!
//! Engine policy (lookback window, bootstrap NAV, dust tolerance) and the
//! storage location are read from a TOML file. A missing file means defaults.
//!
//! Lookup order: explicit `--config` path, `$FUNDNAV_CONFIG`, then
//! `<config_home>/fundnav/config.toml`.

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_CURRENCY: &str = "USD";

/// Pricing policy applied by the NAV engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Calendar days to walk back from the event date looking for a valuation
    pub lookback_days: u32,
    /// NAV used when the fund has no units outstanding, and for unpriced events
    pub bootstrap_nav: Decimal,
    /// Residual balance a full withdrawal may leave behind before it is an error
    pub dust_tolerance: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            bootstrap_nav: Decimal::ONE,
            dust_tolerance: Decimal::new(1, 6),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lookback_days == 0 {
            bail!("engine.lookback_days must be at least 1");
        }
        if self.bootstrap_nav <= Decimal::ZERO {
            bail!(
                "engine.bootstrap_nav must be positive, got {}",
                self.bootstrap_nav
            );
        }
        if self.dust_tolerance < Decimal::ZERO {
            bail!(
                "engine.dust_tolerance must not be negative, got {}",
                self.dust_tolerance
            );
        }
        Ok(())
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub default_currency: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(s).context("Failed to parse config TOML")?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(anyhow!("Config file not found: {}", p.display()));
                }
                Some(p.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(p) => {
                info!("Loading config from {}", p.display());
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("Invalid config file {}", p.display()))?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var("FUNDNAV_LOOKBACK_DAYS") {
            let days: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid FUNDNAV_LOOKBACK_DAYS '{}'", raw))?;
            debug!("FUNDNAV_LOOKBACK_DAYS overrides lookback to {} days", days);
            self.engine.lookback_days = days;
            self.engine.validate()?;
        }
        Ok(())
    }
}

/// Resolve the default config file location
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("FUNDNAV_CONFIG") {
        return Some(PathBuf::from(p));
    }
    dir_spec::config_home().map(|dir| dir.join("fundnav").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.lookback_days, 7);
        assert_eq!(config.engine.bootstrap_nav, Decimal::ONE);
        assert_eq!(config.default_currency, "USD");
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [engine]
            lookback_days = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.lookback_days, 10);
        assert_eq!(config.engine.bootstrap_nav, Decimal::ONE);
        assert_eq!(config.engine.dust_tolerance, dec!(0.000001));
    }

    #[test]
    fn test_full_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            db_path = "/tmp/fund.db"
            default_currency = "EUR"

            [engine]
            lookback_days = 5
            bootstrap_nav = "10"
            dust_tolerance = "0.0001"
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/fund.db")));
        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.engine.bootstrap_nav, dec!(10));
        assert_eq!(config.engine.dust_tolerance, dec!(0.0001));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let err = AppConfig::from_toml_str("[engine]\nlookback_days = 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("lookback_days"));
    }

    #[test]
    fn test_non_positive_bootstrap_rejected() {
        assert!(AppConfig::from_toml_str("[engine]\nbootstrap_nav = \"0\"\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_currency = \"BRL\"\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_currency, "BRL");
    }
}
