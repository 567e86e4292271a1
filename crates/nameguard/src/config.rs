//! File-based configuration.
//!
//! ```toml
//! reject_message = "This name belongs to someone else."
//!
//! [store]
//! host = "localhost"
//! port = 3306
//! username = "root"
//! password = ""
//! database = "nameguard"
//!
//! [validator]
//! track_addresses = true
//! operation_timeout_ms = 3000
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};

use nameguard_store::StoreConfig;
use nameguard_validator::ValidatorConfig;
use serde::{Deserialize, Serialize};

use crate::DEFAULT_REJECT_MESSAGE;

/// Top-level Nameguard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameguardConfig {
    /// Message shown to a player whose login is denied.
    pub reject_message: String,

    /// How to reach the binding database.
    pub store: StoreConfig,

    /// Decision tunables.
    pub validator: ValidatorConfig,
}

impl NameguardConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_toml_str(&raw)
    }
}

impl Default for NameguardConfig {
    fn default() -> Self {
        Self {
            reject_message: DEFAULT_REJECT_MESSAGE.to_string(),
            store: StoreConfig::default(),
            validator: ValidatorConfig::default(),
        }
    }
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_empty_uses_defaults() {
        let config = NameguardConfig::from_toml_str("").expect("should parse");
        assert_eq!(config, NameguardConfig::default());
        assert_eq!(config.reject_message, DEFAULT_REJECT_MESSAGE);
    }

    #[test]
    fn test_from_toml_str_nested_sections() {
        let config = NameguardConfig::from_toml_str(
            r#"
            reject_message = "nope"

            [store]
            host = "db"
            port = 3307
            database = "mc"

            [validator]
            track_addresses = false
            operation_timeout_ms = 250
            "#,
        )
        .expect("should parse");

        assert_eq!(config.reject_message, "nope");
        assert_eq!(config.store.host, "db");
        assert_eq!(config.store.port, 3307);
        assert_eq!(config.store.database, "mc");
        assert_eq!(config.store.username, "root");
        assert!(!config.validator.track_addresses);
        assert_eq!(config.validator.operation_timeout_ms, 250);
    }

    #[test]
    fn test_from_toml_str_wrong_type_returns_parse_error() {
        let result = NameguardConfig::from_toml_str("[store]\nport = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_returns_read_error() {
        let result = NameguardConfig::load("/definitely/not/here/nameguard.toml");
        match result {
            Err(ConfigError::Read { path, .. }) => {
                assert!(path.ends_with("nameguard.toml"));
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
