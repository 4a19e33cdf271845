//! Configuration parsing and management.
//!
//! TOML configuration for the notarization daemon: where to listen, where
//! the ledger and status databases live, and the sender identity stamped on
//! published records. Validation fails closed: a configuration without a
//! usable sender identity is rejected at load time rather than producing
//! anonymous ledger records at runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// HTTP binding settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Notarization log settings.
    pub ledger: LedgerConfig,

    /// Status store settings.
    #[serde(default)]
    pub status: StatusConfig,
}

impl NotaryConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML cannot be
    /// parsed, or validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the `[ledger]` sender
    /// identity is empty.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.sender.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ledger.sender must be a non-empty identity; every published record \
                 is stamped with it"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Notarization log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the ledger database file.
    #[serde(default = "default_ledger_db")]
    pub db_path: PathBuf,

    /// Identity stamped as `sender` on records published by this daemon.
    pub sender: String,
}

/// Status store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Path to the status database file.
    #[serde(default = "default_status_db")]
    pub db_path: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            db_path: default_status_db(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_ledger_db() -> PathBuf {
    PathBuf::from("nullwire-ledger.db")
}

fn default_status_db() -> PathBuf {
    PathBuf::from("nullwire-status.db")
}
