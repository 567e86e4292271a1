//! Binding types: the record that ties a display name to an identity.
//!
//! A "binding" is the store's memory of who owns a name. It tracks:
//! - WHO owns the name (`IdentityKey`)
//! - WHAT the name currently is (the display name, latest casing)
//! - WHERE the identity first and last logged in from (origin addresses)

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest display name the host platform hands out.
pub const MAX_NAME_LEN: usize = 16;

/// Longest identity key the `players` table can hold (a hyphenated UUID).
pub const MAX_IDENTITY_KEY_LEN: usize = 36;

/// Longest origin address the `players` table can hold (IPv6 text form).
pub const MAX_ADDRESS_LEN: usize = 45;

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// The platform-assigned identity a binding belongs to.
///
/// Identity keys are opaque to Nameguard, with one exception: keys that
/// parse as UUIDs are stored in canonical lowercase hyphenated form, so
/// `"0F8FAD5B-D9CB-469F-A165-70867728950E"` and
/// `"0f8fad5bd9cb469fa16570867728950e"` compare equal.
///
/// Serialized as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Canonicalizes a raw key as supplied by the host.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        match Uuid::try_parse(trimmed) {
            Ok(uuid) => Self(uuid.hyphenated().to_string()),
            Err(_) => Self(trimmed.to_string()),
        }
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the canonical form is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// One row of the `players` relation.
///
/// Keyed by `identity_key`; `name` is a unique secondary key compared
/// case-insensitively (see [`fold_name`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The identity that owns `name`. Primary key.
    pub identity_key: IdentityKey,

    /// The display name, with the casing of the latest accepted login.
    pub name: String,

    /// Where the identity's first accepted login came from.
    ///
    /// Written once at insert time and never touched again. `None` when
    /// address tracking was disabled for that login.
    pub first_seen_address: Option<String>,

    /// Where the identity's most recent accepted login came from.
    pub last_seen_address: Option<String>,
}

/// Folds a display name into the form used for uniqueness checks.
///
/// Names are unique regardless of case: once `Alice` is bound, `alice`
/// refers to the same binding.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}
