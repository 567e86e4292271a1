//! Login events as handed over by the host, and their validation.

use nameguard_store::{IdentityKey, MAX_ADDRESS_LEN, MAX_IDENTITY_KEY_LEN, MAX_NAME_LEN};
use serde::{Deserialize, Serialize};

/// A player joining, as reported by the host.
///
/// Fields are raw strings straight from the connection layer; nothing
/// is trusted until the validator has checked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    /// The display name the player is joining with.
    pub name: String,

    /// The platform identity key (a UUID on most hosts).
    pub identity_key: String,

    /// The network address the connection came from, if the host knows it.
    #[serde(default)]
    pub origin_address: Option<String>,
}

impl LoginEvent {
    /// Creates an event with a known origin address.
    pub fn new(
        name: impl Into<String>,
        identity_key: impl Into<String>,
        origin_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            identity_key: identity_key.into(),
            origin_address: Some(origin_address.into()),
        }
    }

    /// Validates the event and canonicalizes its identity key.
    ///
    /// The origin address is dropped here when `track_addresses == false`
    /// or when it is too wide to store; it never affects the decision.
    pub(crate) fn check(
        &self,
        track_addresses: bool,
    ) -> Result<CheckedLogin, EventError> {
        if self.name.trim().is_empty() {
            return Err(EventError::BlankName);
        }
        let name_len = self.name.chars().count();
        if name_len > MAX_NAME_LEN {
            return Err(EventError::NameTooLong(name_len));
        }

        let identity_key = IdentityKey::new(&self.identity_key);
        if identity_key.is_empty() {
            return Err(EventError::BlankIdentityKey);
        }
        let key_len = identity_key.as_str().chars().count();
        if key_len > MAX_IDENTITY_KEY_LEN {
            return Err(EventError::IdentityKeyTooLong(key_len));
        }

        let origin_address = match &self.origin_address {
            Some(address) if track_addresses => {
                let address = address.trim();
                let address_len = address.chars().count();
                if address_len > MAX_ADDRESS_LEN {
                    tracing::debug!(
                        name = %self.name,
                        address_len,
                        "origin address too long to store, dropping it"
                    );
                    None
                } else {
                    (!address.is_empty()).then(|| address.to_string())
                }
            }
            _ => None,
        };

        Ok(CheckedLogin {
            name: self.name.clone(),
            identity_key,
            origin_address,
        })
    }
}

/// A login event that passed validation.
#[derive(Debug, Clone)]
pub(crate) struct CheckedLogin {
    pub(crate) name: String,
    pub(crate) identity_key: IdentityKey,
    pub(crate) origin_address: Option<String>,
}

/// Why a login event was rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("display name is blank")]
    BlankName,

    #[error("display name is {0} characters, limit is {max}", max = MAX_NAME_LEN)]
    NameTooLong(usize),

    #[error("identity key is blank")]
    BlankIdentityKey,

    #[error(
        "identity key is {0} characters, limit is {max}",
        max = MAX_IDENTITY_KEY_LEN
    )]
    IdentityKeyTooLong(usize),
}
