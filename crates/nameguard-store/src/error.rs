//! Error types for the binding store.

/// Errors a [`BindingStore`](crate::BindingStore) can report.
///
/// A store operation either applies completely or fails with one of
/// these; there is no partially applied upsert.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or did not answer in time.
    ///
    /// Covers connection failures, pool exhaustion, operation timeouts,
    /// deadlocks and undecodable rows. Transient from the caller's point
    /// of view: nothing was written.
    #[error("binding store unavailable: {0}")]
    Unavailable(String),

    /// A write collided with a uniqueness constraint.
    ///
    /// Either the name is already bound to a different identity key or
    /// a concurrent login inserted the same identity key first.
    #[error("binding constraint violated: {0}")]
    Violation(String),
}

impl StoreError {
    /// Returns `true` for [`StoreError::Violation`].
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_))
    }
}
