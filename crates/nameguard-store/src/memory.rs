//! In-process binding store.
//!
//! Keeps every binding in memory behind a single `RwLock`. Both unique
//! indexes (identity key and folded name) are checked and updated under
//! the same write guard, so the store gives the same all-or-nothing
//! upsert a database does with its constraints.
//!
//! Useful for tests, for hosts without a database, and as the reference
//! behaviour the MySQL backend must match. Nothing survives a restart.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{Binding, BindingStore, IdentityKey, StoreError, fold_name};

/// A binding store that lives in process memory.
///
/// ## Indexes
///
/// ```text
/// rows:  IdentityKey ──→ Binding        (primary key)
/// names: fold(name)  ──→ IdentityKey    (unique secondary key)
/// ```
///
/// The two maps are always changed together; `names` never points at a
/// key that isn't in `rows`, and every row has exactly one `names` entry.
#[derive(Default)]
pub struct MemoryBindingStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<IdentityKey, Binding>,
    names: HashMap<String, IdentityKey>,
}

impl MemoryBindingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a binding by identity key.
    pub async fn get(&self, identity_key: &IdentityKey) -> Option<Binding> {
        self.tables.read().await.rows.get(identity_key).cloned()
    }

    /// Returns every binding, ordered by identity key.
    pub async fn snapshot(&self) -> Vec<Binding> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Binding> = tables.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.identity_key.as_str().cmp(b.identity_key.as_str()));
        rows
    }

    /// Returns the number of stored bindings.
    pub async fn len(&self) -> usize {
        self.tables.read().await.rows.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.rows.is_empty()
    }
}

impl BindingStore for MemoryBindingStore {
    async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        let tables = self.tables.read().await;
        let binding = tables
            .names
            .get(&fold_name(name))
            .and_then(|key| tables.rows.get(key))
            .cloned();
        Ok(binding)
    }

    async fn upsert(
        &self,
        identity_key: &IdentityKey,
        name: &str,
        origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        let folded = fold_name(name);
        let mut guard = self.tables.write().await;
        // Split the guard so both maps can be borrowed mutably at once.
        let Tables { rows, names } = &mut *guard;

        if let Some(holder) = names.get(&folded) {
            if holder != identity_key {
                return Err(StoreError::Violation(format!(
                    "name {name} is bound to {holder}"
                )));
            }
        }

        match rows.get_mut(identity_key) {
            Some(row) => {
                let previous = fold_name(&row.name);
                if previous != folded {
                    names.remove(&previous);
                    names.insert(folded, identity_key.clone());
                    tracing::debug!(
                        %identity_key,
                        from = %row.name,
                        to = %name,
                        "binding renamed"
                    );
                }
                row.name = name.to_string();
                if let Some(address) = origin_address {
                    row.last_seen_address = Some(address.to_string());
                }
            }
            None => {
                names.insert(folded, identity_key.clone());
                rows.insert(
                    identity_key.clone(),
                    Binding {
                        identity_key: identity_key.clone(),
                        name: name.to_string(),
                        first_seen_address: origin_address.map(str::to_string),
                        last_seen_address: origin_address.map(str::to_string),
                    },
                );
            }
        }

        Ok(())
    }

    async fn touch_last_seen(
        &self,
        identity_key: &IdentityKey,
        origin_address: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.rows.get_mut(identity_key) {
            Some(row) => row.last_seen_address = Some(origin_address.to_string()),
            None => {
                tracing::debug!(%identity_key, "touch_last_seen matched no binding");
            }
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
