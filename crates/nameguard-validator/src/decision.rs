//! The result of evaluating a login.

use std::fmt;

use nameguard_store::StoreError;

use crate::EventError;

/// What the validator concluded about one login event.
///
/// Exactly one of these comes back from every evaluation; there is no
/// error path. Only [`Decision::Deny`] should be visible to the player.
///
/// ```text
/// Allow       → let the session through (binding written)
/// Deny        → reject the session, suppress the join broadcast
/// Unresolved  → store failed; leave the session alone (fail-open)
/// Invalid     → event malformed; nothing written
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The identity may use the name.
    Allow { outcome: AllowOutcome },

    /// The name belongs to someone else.
    Deny { reason: DenyReason },

    /// The store could not be read or written. The validator neither
    /// allows nor denies; the host's default behaviour applies.
    Unresolved { error: StoreError },

    /// The event failed validation and nothing was written. Only an
    /// unstorable identity key gets as far as a name lookup.
    Invalid { error: EventError },
}

impl Decision {
    /// Returns `true` for [`Decision::Allow`].
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Returns `true` for [`Decision::Deny`].
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Short machine-friendly label: `allow`, `deny`, `unresolved`, `invalid`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow { .. } => "allow",
            Self::Deny { .. } => "deny",
            Self::Unresolved { .. } => "unresolved",
            Self::Invalid { .. } => "invalid",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow { outcome } => write!(f, "allow ({outcome})"),
            Self::Deny { reason } => write!(f, "deny: {reason}"),
            Self::Unresolved { error } => write!(f, "unresolved: {error}"),
            Self::Invalid { error } => write!(f, "invalid: {error}"),
        }
    }
}

/// Which write an allowed login caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowOutcome {
    /// The name was free and is now bound to the identity.
    Claimed,

    /// The name was already bound to this identity.
    Reaffirmed,
}

impl fmt::Display for AllowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claimed => write!(f, "claimed"),
            Self::Reaffirmed => write!(f, "reaffirmed"),
        }
    }
}

/// Why a login was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The stored binding for the name holds a different identity key.
    NameBoundToOtherIdentity,

    /// The write lost a race against a concurrent login and the re-read
    /// did not show the name bound to this identity.
    ClaimConflict,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameBoundToOtherIdentity => {
                write!(f, "name already bound to a different identity")
            }
            Self::ClaimConflict => {
                write!(f, "name claim conflicted with a concurrent login")
            }
        }
    }
}
