//! Login decisions for Nameguard.
//!
//! Given a login event `(name, identity key, origin address)`, the
//! [`BindingValidator`] answers one question: is this identity allowed to
//! use this name? It reads the stored binding, decides, and writes back
//! through a [`BindingStore`](nameguard_store::BindingStore).
//!
//! ```text
//! LoginEvent ──→ check ──→ find_by_name ──┬─ none ──────→ upsert ──→ Allow(Claimed)
//!                  │                      ├─ same key ──→ touch  ──→ Allow(Reaffirmed)
//!                  ▼                      └─ other key ─────────────→ Deny
//!               Invalid          (store error anywhere → Unresolved)
//! ```

mod config;
mod decision;
mod event;
mod validator;

pub use config::ValidatorConfig;
pub use decision::{AllowOutcome, Decision, DenyReason};
pub use event::{EventError, LoginEvent};
pub use validator::BindingValidator;
