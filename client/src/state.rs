use std::fmt;

use caelium_protocol::ServerEvent;

/// Lifecycle of the realtime session.
///
/// ```text
/// Idle -> Connecting -> Open -> Closing -> Idle            (shutdown)
///                        Open -> ReconnectPending          (unplanned close)
///         Connecting -> ReconnectPending                   (handshake failed)
/// ReconnectPending -> Connecting                           (delay elapsed, token present)
/// ReconnectPending -> Idle                                 (shutdown or token gone)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session and nothing scheduled
    Idle,
    /// Websocket handshake in progress
    Connecting,
    /// Socket is live; sends are transmitted
    Open,
    /// Closing at our request; will not reconnect
    Closing,
    /// Socket dropped; a single reconnect attempt is scheduled
    ReconnectPending,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether a driver task is alive for this state
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::ReconnectPending => "reconnect-pending",
        };
        f.write_str(name)
    }
}

/// Why an open session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server sent a close frame or the stream ended
    ClosedByServer,
    /// Read or write failed at the transport level
    Transport(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClosedByServer => f.write_str("closed by server"),
            Self::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Everything the manager delivers to subscribers, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The socket opened
    Connected,
    /// An open socket dropped; a reconnect is scheduled
    Disconnected(DisconnectReason),
    /// A decoded server event
    Server(ServerEvent),
}
