//! Database connection configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database name
    /// Env: FERRODOC_DATABASE
    /// Default: "ferrodoc"
    pub name: String,

    /// Name the connection is registered under
    /// Env: FERRODOC_CONNECTION
    /// Default: "default"
    pub connection_name: String,

    /// Time allowed for each index creation request, in milliseconds
    /// Env: FERRODOC_INDEX_TIMEOUT_MS
    /// Default: 5000
    pub index_timeout_ms: u64,

    /// Ping the store when connecting
    /// Env: FERRODOC_PING_ON_CONNECT
    /// Default: true
    pub ping_on_connect: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "ferrodoc".to_string(),
            connection_name: crate::connection::DEFAULT_CONNECTION.to_string(),
            index_timeout_ms: 5000,
            ping_on_connect: true,
        }
    }
}

impl DatabaseConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(name) = env::var("FERRODOC_DATABASE") {
            self.name = name;
        }

        if let Ok(connection) = env::var("FERRODOC_CONNECTION") {
            self.connection_name = connection;
        }

        if let Ok(timeout) = env::var("FERRODOC_INDEX_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.index_timeout_ms = t;
            }
        }

        if let Ok(ping) = env::var("FERRODOC_PING_ON_CONNECT") {
            self.ping_on_connect = ping.parse().unwrap_or(true);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Invalid database name: must not be empty");
        }

        if self.connection_name.trim().is_empty() {
            bail!("Invalid connection_name: must not be empty");
        }

        if self.index_timeout_ms == 0 {
            bail!("Invalid index_timeout_ms: must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = DatabaseConfig { index_timeout_ms: 0, ..DatabaseConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let config = DatabaseConfig { name: "  ".to_string(), ..DatabaseConfig::default() };
        assert!(config.validate().is_err());
    }
}
