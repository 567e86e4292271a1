//! The host's side of a login: the ability to turn a player away.
//!
//! Nameguard doesn't own connections. When it denies a login it asks the
//! host to end the session through the [`LoginSession`] trait, which the
//! host implements over its own connection type (a kick packet, a close
//! frame, a disconnect call).

use std::future::Future;

/// A session that is still being established.
///
/// # Trait bounds
///
/// - `Send + Sync` → the handler may run on any Tokio worker.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
///
/// use nameguard::LoginSession;
///
/// /// Remembers the kick message instead of sending it anywhere.
/// #[derive(Default)]
/// struct RecordingSession {
///     kicked_with: Mutex<Option<String>>,
/// }
///
/// impl LoginSession for RecordingSession {
///     async fn reject(&self, message: &str) {
///         *self.kicked_with.lock().unwrap() = Some(message.to_string());
///     }
/// }
/// ```
pub trait LoginSession: Send + Sync {
    /// Terminates the session with `message` and suppresses the join
    /// broadcast for it.
    ///
    /// Awaited before the handler returns, so the player is gone before
    /// the host finishes establishing the session.
    fn reject(&self, message: &str) -> impl Future<Output = ()> + Send;
}
