//! The binding validator: decides each login and drives the store.
//!
//! # Concurrency note
//!
//! `BindingValidator` holds no locks of its own. Two logins for the same
//! name can both read "no binding" and both try to claim it; the store's
//! uniqueness constraints make exactly one of those writes succeed. The
//! loser sees [`StoreError::Violation`], re-reads the name, and ends up
//! with `Deny` unless the winner was the same identity.
//!
//! Each evaluation costs one read and at most one write (plus one re-read
//! after a conflict). Every round trip is bounded by
//! [`ValidatorConfig::operation_timeout`].

use std::future::Future;

use nameguard_store::{BindingStore, StoreError};

use crate::event::CheckedLogin;
use crate::{
    AllowOutcome, Decision, DenyReason, EventError, LoginEvent,
    ValidatorConfig,
};

/// Decides whether a login may use its display name.
///
/// Owns the store handle it was constructed with; share the validator
/// itself (e.g. in an `Arc`) across login tasks.
pub struct BindingValidator<S: BindingStore> {
    store: S,
    config: ValidatorConfig,
}

impl<S: BindingStore> BindingValidator<S> {
    /// Creates a validator over `store`.
    pub fn new(store: S, config: ValidatorConfig) -> Self {
        Self { store, config }
    }

    /// Returns the store this validator reads and writes.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configuration the validator was built with.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Evaluates one login event.
    ///
    /// - name unbound → claim it (`upsert`) → `Allow(Claimed)`
    /// - name bound to this identity → refresh last-seen → `Allow(Reaffirmed)`
    /// - name bound to another identity → `Deny`, nothing written
    /// - store error → `Unresolved`, logged, never retried
    /// - malformed event → `Invalid`, store untouched
    /// - identity key too wide to store → `Deny` if the name is bound,
    ///   otherwise `Invalid`; nothing written
    pub async fn evaluate(&self, event: &LoginEvent) -> Decision {
        let login = match event.check(self.config.track_addresses) {
            Ok(login) => login,
            Err(error @ EventError::IdentityKeyTooLong(_)) => {
                return self.screen_unstorable(event, error).await;
            }
            Err(error) => {
                tracing::warn!(
                    name = %event.name,
                    identity_key = %event.identity_key,
                    %error,
                    "ignoring malformed login event"
                );
                return Decision::Invalid { error };
            }
        };

        let existing =
            match self.bounded(self.store.find_by_name(&login.name)).await {
                Ok(existing) => existing,
                Err(error) => {
                    return unresolved(
                        &login.name,
                        login.identity_key.as_str(),
                        error,
                    );
                }
            };

        match existing {
            None => self.claim(&login).await,
            Some(binding) if binding.identity_key == login.identity_key => {
                self.reaffirm(&login, &binding.name).await
            }
            Some(binding) => {
                tracing::info!(
                    name = %login.name,
                    identity_key = %login.identity_key,
                    holder = %binding.identity_key,
                    "login denied: name bound to a different identity"
                );
                Decision::Deny {
                    reason: DenyReason::NameBoundToOtherIdentity,
                }
            }
        }
    }

    /// Handles a login whose identity key can never own a binding.
    ///
    /// No stored key is that wide, so a bound name always belongs to
    /// someone else. An unbound name stays unbound.
    async fn screen_unstorable(
        &self,
        event: &LoginEvent,
        error: EventError,
    ) -> Decision {
        match self.bounded(self.store.find_by_name(&event.name)).await {
            Ok(Some(binding)) => {
                tracing::info!(
                    name = %event.name,
                    identity_key = %event.identity_key,
                    holder = %binding.identity_key,
                    "login denied: unstorable identity key on a bound name"
                );
                Decision::Deny {
                    reason: DenyReason::NameBoundToOtherIdentity,
                }
            }
            Ok(None) => {
                tracing::warn!(
                    name = %event.name,
                    identity_key = %event.identity_key,
                    %error,
                    "ignoring login with unstorable identity key"
                );
                Decision::Invalid { error }
            }
            Err(store_error) => {
                unresolved(&event.name, &event.identity_key, store_error)
            }
        }
    }

    /// Binds a free name to the login's identity.
    async fn claim(&self, login: &CheckedLogin) -> Decision {
        let write = self.store.upsert(
            &login.identity_key,
            &login.name,
            login.origin_address.as_deref(),
        );

        match self.bounded(write).await {
            Ok(()) => {
                tracing::info!(
                    name = %login.name,
                    identity_key = %login.identity_key,
                    "name claimed"
                );
                Decision::Allow {
                    outcome: AllowOutcome::Claimed,
                }
            }
            Err(StoreError::Violation(detail)) => {
                tracing::debug!(
                    name = %login.name,
                    identity_key = %login.identity_key,
                    %detail,
                    "claim conflicted, re-checking binding"
                );
                self.recheck(login).await
            }
            Err(error) => {
                unresolved(&login.name, login.identity_key.as_str(), error)
            }
        }
    }

    /// Refreshes an existing binding held by the login's identity.
    ///
    /// `stored_name` is the name as stored; a casing change is written back
    /// through `upsert` so the binding shows the latest spelling.
    async fn reaffirm(&self, login: &CheckedLogin, stored_name: &str) -> Decision {
        let result = if stored_name != login.name {
            self.bounded(self.store.upsert(
                &login.identity_key,
                &login.name,
                login.origin_address.as_deref(),
            ))
            .await
        } else if let Some(address) = login.origin_address.as_deref() {
            self.bounded(self.store.touch_last_seen(&login.identity_key, address))
                .await
        } else {
            // Untracked and unchanged: nothing to write.
            Ok(())
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    name = %login.name,
                    identity_key = %login.identity_key,
                    "name reaffirmed"
                );
                Decision::Allow {
                    outcome: AllowOutcome::Reaffirmed,
                }
            }
            Err(StoreError::Violation(detail)) => {
                tracing::debug!(%detail, "reaffirm conflicted, re-checking binding");
                self.recheck(login).await
            }
            Err(error) => {
                unresolved(&login.name, login.identity_key.as_str(), error)
            }
        }
    }

    /// Re-reads the binding after a constraint conflict.
    ///
    /// Only a binding that now shows this identity turns into `Allow`.
    async fn recheck(&self, login: &CheckedLogin) -> Decision {
        match self.bounded(self.store.find_by_name(&login.name)).await {
            Ok(Some(binding)) if binding.identity_key == login.identity_key => {
                Decision::Allow {
                    outcome: AllowOutcome::Reaffirmed,
                }
            }
            Ok(Some(binding)) => {
                tracing::info!(
                    name = %login.name,
                    identity_key = %login.identity_key,
                    holder = %binding.identity_key,
                    "login denied: concurrent claim bound the name elsewhere"
                );
                Decision::Deny {
                    reason: DenyReason::NameBoundToOtherIdentity,
                }
            }
            Ok(None) => {
                tracing::info!(
                    name = %login.name,
                    identity_key = %login.identity_key,
                    "login denied: claim conflicted with a concurrent login"
                );
                Decision::Deny {
                    reason: DenyReason::ClaimConflict,
                }
            }
            Err(error) => {
                unresolved(&login.name, login.identity_key.as_str(), error)
            }
        }
    }

    /// Runs a store operation under the configured timeout.
    ///
    /// A timeout becomes [`StoreError::Unavailable`], never a denial.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.config.operation_timeout();
        match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "store operation timed out after {}ms",
                limit.as_millis()
            ))),
        }
    }
}

/// Logs a store failure and leaves the login undecided.
fn unresolved(name: &str, identity_key: &str, error: StoreError) -> Decision {
    tracing::error!(
        name,
        identity_key,
        %error,
        "binding store failed, login left unresolved"
    );
    Decision::Unresolved { error }
}
