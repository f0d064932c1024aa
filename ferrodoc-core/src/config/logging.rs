//! Logging configuration

use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Env: FERRODOC_LOG_LEVEL
    /// Default: "info"
    pub level: String,

    /// "human", "json" or "logfmt"
    /// Env: FERRODOC_LOG_FORMAT
    /// Default: "human"
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "human".to_string() }
    }
}

impl LoggingSettings {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("FERRODOC_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("FERRODOC_LOG_FORMAT") {
            self.format = format;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.to_logging_config().map(|_| ())
    }

    /// Build the logger configuration these settings describe
    pub fn to_logging_config(&self) -> Result<LoggingConfig> {
        let level: LogLevel =
            self.level.parse().map_err(|_| anyhow!("Invalid log level: {}", self.level))?;
        let format: LogFormat =
            self.format.parse().map_err(|_| anyhow!("Invalid log format: {}", self.format))?;
        Ok(LoggingConfig::default().with_level(level).with_format(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_logging_config() {
        let settings = LoggingSettings { level: "debug".into(), format: "json".into() };
        let config = settings.to_logging_config().unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_level() {
        let settings = LoggingSettings { level: "loud".into(), ..LoggingSettings::default() };
        assert!(settings.validate().is_err());
    }
}
