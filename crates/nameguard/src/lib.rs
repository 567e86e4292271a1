//! # Nameguard
//!
//! Binds every display name to the first identity key that used it and
//! rejects later logins that reuse the name under a different key.
//!
//! The host implements one trait, [`LoginSession`], and forwards each join
//! event to [`NameGuard::on_login`]. Nameguard decides, records the
//! binding, and asks the host to reject impersonators.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nameguard::prelude::*;
//!
//! struct Player;
//!
//! impl LoginSession for Player {
//!     async fn reject(&self, message: &str) {
//!         // Kick the player with `message`, suppress the join broadcast.
//!         let _ = message;
//!     }
//! }
//!
//! # async fn run() {
//! let guard = NameGuard::builder().build(MemoryBindingStore::new());
//!
//! let event = LoginEvent::new("Alice", "uuid-1", "1.1.1.1");
//! let decision = guard.on_login(&event, &Player).await;
//! assert!(decision.is_allow());
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod guard;
mod session;

pub use config::{ConfigError, NameguardConfig};
pub use error::NameguardError;
pub use guard::{DEFAULT_REJECT_MESSAGE, NameGuard, NameGuardBuilder};
pub use session::LoginSession;

pub use nameguard_store as store;
pub use nameguard_validator as validator;

/// Everything a host needs to wire Nameguard in.
pub mod prelude {
    pub use crate::{
        LoginSession, NameGuard, NameGuardBuilder, NameguardConfig,
        NameguardError,
    };
    #[cfg(feature = "mysql")]
    pub use nameguard_store::MySqlBindingStore;
    pub use nameguard_store::{
        Binding, BindingStore, IdentityKey, MemoryBindingStore, StoreConfig,
        StoreError,
    };
    pub use nameguard_validator::{
        AllowOutcome, BindingValidator, Decision, DenyReason, EventError,
        LoginEvent, ValidatorConfig,
    };
}
