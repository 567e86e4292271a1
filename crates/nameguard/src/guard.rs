//! `NameGuard` builder and login handler.
//!
//! This is the entry point a host registers for join events. It ties the
//! layers together: host event → validator → store, and on denial back
//! out to the host's [`LoginSession`].

use std::sync::Arc;

use nameguard_store::BindingStore;
use nameguard_validator::{
    BindingValidator, Decision, LoginEvent, ValidatorConfig,
};

use crate::{LoginSession, NameguardConfig};

/// Shown to a player whose name is bound to a different identity.
pub const DEFAULT_REJECT_MESSAGE: &str = "Wrong login: someone with the same name but a different UUID is already registered here";

/// Builder for configuring a [`NameGuard`].
///
/// # Example
///
/// ```rust
/// use nameguard::prelude::*;
///
/// let guard = NameGuard::builder()
///     .reject_message("That name is taken.")
///     .validator_config(ValidatorConfig {
///         track_addresses: false,
///         ..ValidatorConfig::default()
///     })
///     .build(MemoryBindingStore::new());
/// assert_eq!(guard.reject_message(), "That name is taken.");
/// ```
#[derive(Debug, Clone)]
pub struct NameGuardBuilder {
    validator_config: ValidatorConfig,
    reject_message: String,
}

impl NameGuardBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            validator_config: ValidatorConfig::default(),
            reject_message: DEFAULT_REJECT_MESSAGE.to_string(),
        }
    }

    /// Takes the validator settings and rejection message from a config file.
    pub fn from_config(config: &NameguardConfig) -> Self {
        Self {
            validator_config: config.validator.clone(),
            reject_message: config.reject_message.clone(),
        }
    }

    /// Sets the validator configuration.
    pub fn validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator_config = config;
        self
    }

    /// Sets the message denied players are kicked with.
    pub fn reject_message(mut self, message: &str) -> Self {
        self.reject_message = message.to_string();
        self
    }

    /// Builds the guard over an already connected store.
    pub fn build<S: BindingStore>(self, store: S) -> NameGuard<S> {
        NameGuard {
            validator: Arc::new(BindingValidator::new(
                store,
                self.validator_config,
            )),
            reject_message: Arc::from(self.reject_message),
        }
    }
}

impl Default for NameGuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The login handler.
///
/// Cheap to clone; clones share the validator and store, so hand one to
/// every task that processes join events.
pub struct NameGuard<S: BindingStore> {
    validator: Arc<BindingValidator<S>>,
    reject_message: Arc<str>,
}

impl<S: BindingStore> Clone for NameGuard<S> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
            reject_message: Arc::clone(&self.reject_message),
        }
    }
}

impl NameGuard<nameguard_store::MemoryBindingStore> {
    /// Creates a new builder.
    pub fn builder() -> NameGuardBuilder {
        NameGuardBuilder::new()
    }
}

#[cfg(feature = "mysql")]
impl NameGuard<nameguard_store::MySqlBindingStore> {
    /// Provisions the MySQL store described by `config` and builds a guard
    /// over it.
    ///
    /// Provisioning failures are fatal: a guard that can't reach its store
    /// would leave every login unresolved.
    pub async fn connect(
        config: &NameguardConfig,
    ) -> Result<Self, crate::NameguardError> {
        let store =
            nameguard_store::MySqlBindingStore::provision(&config.store).await?;
        Ok(NameGuardBuilder::from_config(config).build(store))
    }
}

impl<S: BindingStore> NameGuard<S> {
    /// Handles one join event.
    ///
    /// Evaluates the login and, on [`Decision::Deny`], rejects the session
    /// with the configured message before returning. Every other decision
    /// leaves the session untouched; in particular a store failure
    /// (`Unresolved`) lets the player in.
    pub async fn on_login<L: LoginSession>(
        &self,
        event: &LoginEvent,
        session: &L,
    ) -> Decision {
        let decision = self.validator.evaluate(event).await;

        if decision.is_deny() {
            session.reject(&self.reject_message).await;
            tracing::info!(
                name = %event.name,
                identity_key = %event.identity_key,
                "session rejected"
            );
        }

        decision
    }

    /// Returns the validator that decides each login.
    pub fn validator(&self) -> &BindingValidator<S> {
        &self.validator
    }

    /// Returns the binding store shared by every clone of this guard.
    pub fn store(&self) -> &S {
        self.validator.store()
    }

    /// Returns the message denied players are kicked with.
    pub fn reject_message(&self) -> &str {
        &self.reject_message
    }
}
