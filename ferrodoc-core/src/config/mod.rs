//! Configuration system for Ferrodoc
//!
//! # Configuration Hierarchy
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on `Client`/`ModelOptions`) - Highest priority
//! 2. **Environment Variables** (`FERRODOC_*`) - Override file config
//! 3. **Config File** (ferrodoc.toml) - Override defaults
//! 4. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use ferrodoc_core::config::FerrodocConfig;
//!
//! // Load with full supersedence
//! let config = FerrodocConfig::load()?;
//!
//! // Or load from specific file
//! let config = FerrodocConfig::from_file("ferrodoc.toml")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod database;
pub mod logging;

pub use database::DatabaseConfig;
pub use logging::LoggingSettings;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE: &str = "ferrodoc.toml";

/// Complete Ferrodoc configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FerrodocConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingSettings,
}

impl FerrodocConfig {
    /// Load configuration with full supersedence chain
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (ferrodoc.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Start with defaults
        let mut config = Self::default();

        // Load from file if it exists
        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        // Apply environment variables (highest priority)
        config.apply_env_vars();

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.database.merge(other.database);
        self.logging.merge(other.logging);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.database.apply_env_vars();
        self.logging.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FerrodocConfig::default();
        assert_eq!(config.database.name, "ferrodoc");
        assert_eq!(config.database.connection_name, "default");
        assert_eq!(config.database.index_timeout_ms, 5000);
        assert!(config.database.ping_on_connect);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = FerrodocConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nname = \"shop\"\nindex_timeout_ms = 1500").unwrap();

        let config = FerrodocConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.name, "shop");
        assert_eq!(config.database.index_timeout_ms, 1500);
        assert_eq!(config.database.connection_name, "default");
        assert_eq!(config.logging.format, "human");
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database\nname = ").unwrap();
        assert!(FerrodocConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FerrodocConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.database.index_timeout_ms, 5000);
    }
}
