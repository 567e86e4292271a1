//! The storage contract the validator drives.
//!
//! Nameguard doesn't care where bindings live. It needs three operations
//! and one guarantee: uniqueness of `name` and of `identity_key` is
//! enforced by the store itself, so two racing logins can't both write.
//! Anything that provides that can back the validator.

use std::future::Future;

use crate::{Binding, IdentityKey, StoreError};

/// Durable storage for [`Binding`]s.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by every login task.
/// - `'static` → the store lives as long as the host process.
///
/// # Example
///
/// ```rust
/// use nameguard_store::{BindingStore, IdentityKey, MemoryBindingStore};
///
/// # tokio_test_block(async {
/// let store = MemoryBindingStore::new();
/// let key = IdentityKey::new("uuid-1");
///
/// store.upsert(&key, "Alice", Some("1.1.1.1")).await.unwrap();
///
/// let binding = store.find_by_name("alice").await.unwrap().unwrap();
/// assert_eq!(binding.identity_key, key);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub trait BindingStore: Send + Sync + 'static {
    /// Returns the binding whose name equals `name` (case-insensitively),
    /// reading committed state only.
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Binding>, StoreError>> + Send;

    /// Inserts or updates the row keyed by `identity_key`, atomically.
    ///
    /// - No row for the key → insert with
    ///   `first_seen_address = last_seen_address = origin_address`.
    /// - Row exists → set `name` and, when `origin_address` is `Some`,
    ///   `last_seen_address`. `first_seen_address` is never touched.
    ///
    /// # Errors
    /// - [`StoreError::Violation`]: `name` is bound to another identity,
    ///   or the write lost to a concurrent one (duplicate key, deadlock)
    /// - [`StoreError::Unavailable`]: the store could not apply the write
    fn upsert(
        &self,
        identity_key: &IdentityKey,
        name: &str,
        origin_address: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Refreshes `last_seen_address` for an existing row, leaving `name`
    /// and `first_seen_address` alone. A missing row is not an error.
    fn touch_last_seen(
        &self,
        identity_key: &IdentityKey,
        origin_address: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
