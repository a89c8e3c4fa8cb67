use async_trait::async_trait;
use caelium_protocol::{NewMessage, PresenceStatus};

use crate::state::DisconnectReason;

/// Trait for handling realtime events.
///
/// Implement this trait to react to the socket. All methods have default
/// no-op implementations, so you only need to implement the events you care
/// about.
///
/// # Example
///
/// ```ignore
/// struct Unread {
///     count: usize,
/// }
///
/// #[async_trait]
/// impl Handler for Unread {
///     async fn on_new_message(&mut self, _message: &NewMessage) {
///         self.count += 1;
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send {
    /// Called when the socket opens, including after a reconnect.
    async fn on_connected(&mut self) {}

    /// Called when an open socket drops. A reconnect is already scheduled.
    async fn on_disconnected(&mut self, reason: &DisconnectReason) {
        let _ = reason;
    }

    /// Called with the full list of online users.
    async fn on_online_users(&mut self, user_ids: &[u64]) {
        let _ = user_ids;
    }

    async fn on_status_update(&mut self, user_id: u64, status: PresenceStatus) {
        let _ = (user_id, status);
    }

    async fn on_typing(&mut self, chat_id: u64, user_id: u64) {
        let _ = (chat_id, user_id);
    }

    async fn on_new_message(&mut self, message: &NewMessage) {
        let _ = message;
    }
}
