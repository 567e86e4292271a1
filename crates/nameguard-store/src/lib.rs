//! Name-to-identity binding storage for Nameguard.
//!
//! This crate owns the only shared mutable resource in the system: the
//! table of [`Binding`]s that ties a display name to one identity key.
//!
//! 1. **Data model**: [`Binding`] and the canonical [`IdentityKey`]
//! 2. **Storage contract**: the [`BindingStore`] trait (lookup by name,
//!    atomic upsert keyed by identity, last-seen refresh)
//! 3. **Backends**: [`MemoryBindingStore`] (in-process) and, with the
//!    `mysql` feature, `MySqlBindingStore`
//!
//! # How it fits in the stack
//!
//! ```text
//! Host integration (nameguard)  ← rejects sessions on Deny
//!     ↕
//! Validator (nameguard-validator)  ← decides Allow / Deny / Unresolved
//!     ↕
//! Store (this crate)  ← enforces one binding per name and per identity
//! ```
//!
//! # Feature Flags
//!
//! - `mysql`: MySQL backend via `sqlx`, including schema provisioning

#![allow(async_fn_in_trait)]

mod binding;
mod config;
mod error;
mod memory;
#[cfg(feature = "mysql")]
mod mysql;
mod store;

pub use binding::{
    Binding, IdentityKey, MAX_ADDRESS_LEN, MAX_IDENTITY_KEY_LEN, MAX_NAME_LEN,
    fold_name,
};
pub use config::StoreConfig;
pub use error::StoreError;
pub use memory::MemoryBindingStore;
#[cfg(feature = "mysql")]
pub use mysql::MySqlBindingStore;
pub use store::BindingStore;
