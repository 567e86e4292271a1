//! Unified error type for Nameguard setup.

use nameguard_store::StoreError;

use crate::ConfigError;

/// Top-level error that wraps the crate-specific errors.
///
/// Only startup can fail this way (loading config, provisioning the
/// store). Per-login failures never surface as errors; they come back as
/// a [`Decision`](nameguard_validator::Decision).
#[derive(Debug, thiserror::Error)]
pub enum NameguardError {
    /// The configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The binding store could not be reached or provisioned.
    #[error(transparent)]
    Store(#[from] StoreError),
}
