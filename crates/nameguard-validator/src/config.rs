//! Validator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for [`BindingValidator`](crate::BindingValidator).
///
/// `#[serde(default)]` lets a config file set only the fields it cares
/// about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Whether origin addresses are recorded.
    ///
    /// When `false`, bindings are written without first/last-seen
    /// addresses and a reaffirming login performs no write at all.
    pub track_addresses: bool,

    /// Upper bound on each store round trip, in milliseconds.
    ///
    /// A store call that takes longer counts as the store being
    /// unavailable; it never turns into a denial.
    pub operation_timeout_ms: u64,
}

impl ValidatorConfig {
    /// Returns the per-operation timeout as a `Duration`.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            track_addresses: true,
            operation_timeout_ms: 3_000,
        }
    }
}
