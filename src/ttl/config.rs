use crate::Result;

use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid ledger configuration: {0}")]
    Invalid(String),
}

/// Tunables for the ledger. Every field has a default, so an empty TOML document is valid.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Longest wait for a row lock before the atomic unit gives up
    pub lock_timeout_ms: u64,

    /// Expiry applied when a submission doesn't name one
    pub default_expiry_hours: u32,

    pub max_expiry_hours: u32,

    pub max_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        return Self {
            lock_timeout_ms: 2_000,
            default_expiry_hours: 72,
            max_expiry_hours: 720,
            max_page_size: 100,
        };
    }
}

impl LedgerConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;

        return Ok(config);
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let toml = fs::read_to_string(path)
            .with_context(|| format!("Couldn't read config file: {path:?}"))?;

        return Self::from_toml_str(&toml).with_context(|| format!("In config file: {path:?}"));
    }

    pub fn validate(&self) -> Result {
        if self.lock_timeout_ms == 0 {
            Err(ConfigError::Invalid("lock_timeout_ms must be positive".to_string()))?
        }

        if self.default_expiry_hours == 0 || self.max_expiry_hours == 0 {
            Err(ConfigError::Invalid("expiry hours must be positive".to_string()))?
        }

        if self.default_expiry_hours > self.max_expiry_hours {
            Err(ConfigError::Invalid(format!(
                "default_expiry_hours {} exceeds max_expiry_hours {}",
                self.default_expiry_hours, self.max_expiry_hours
            )))?
        }

        if self.max_page_size == 0 {
            Err(ConfigError::Invalid("max_page_size must be positive".to_string()))?
        }

        return Ok(());
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(
            LedgerConfig::from_toml_str("").unwrap(),
            LedgerConfig::default()
        );
    }

    #[test]
    fn partial_document() {
        let config = LedgerConfig::from_toml_str("lock_timeout_ms = 50\nmax_page_size = 10\n")
            .unwrap();

        assert_eq!(config.lock_timeout(), Duration::from_millis(50));
        assert_eq!(config.max_page_size, 10);
        assert_eq!(config.default_expiry_hours, 72);
    }

    #[test]
    fn rejects_inconsistent_values() {
        assert!(LedgerConfig::from_toml_str("lock_timeout_ms = 0").is_err());
        assert!(LedgerConfig::from_toml_str("default_expiry_hours = 1000").is_err());
        assert!(LedgerConfig::from_toml_str("unknown_field = 1").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_expiry_hours = 24").unwrap();

        let config = LedgerConfig::load(file.path()).unwrap();

        assert_eq!(config.default_expiry_hours, 24);
        assert!(LedgerConfig::load("/definitely/not/here.toml").is_err());
    }
}
