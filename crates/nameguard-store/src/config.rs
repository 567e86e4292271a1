//! Connection parameters for persistent backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the binding database lives and how to reach it.
///
/// Only used to construct a store; nothing here affects how logins are
/// decided. Every field has a default, so a config file only needs to
/// mention what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,

    /// Database (schema) holding the `players` table. Created on
    /// provisioning if it doesn't exist.
    pub database: String,

    /// Upper bound on pooled connections.
    pub max_connections: u32,

    /// How long to wait for a connection (new or from the pool) before
    /// giving up with [`StoreError::Unavailable`](crate::StoreError).
    pub connect_timeout_secs: u64,
}

impl StoreConfig {
    /// Returns the connect / acquire timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: "nameguard".to_string(),
            max_connections: 10,
            connect_timeout_secs: 5,
        }
    }
}
