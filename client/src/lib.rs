//! Realtime client for Caelium.
//!
//! Two independent pieces give the client resilience against a single
//! unreachable backend:
//!
//! - [`ConnectionManager`] keeps one authenticated websocket open and
//!   reconnects after unplanned closes.
//! - [`ServerSelector`] picks a backend origin by weighted random choice from
//!   a cached [`ServerDirectory`], and reports servers that turn out to be
//!   unreachable.

pub mod auth;
pub mod config;
mod connection;
pub mod directory;
pub mod error;
mod handler;
mod manager;
mod receiver;
pub mod selector;
mod sender;
mod state;

pub use caelium_protocol::{
    ClientCommand, DecodeError, NewMessage, PresenceStatus, ServerDescriptor, ServerEvent,
};

pub use auth::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
pub use config::ClientConfig;
pub use directory::{DirectoryApi, HttpDirectoryApi, ServerDirectory};
pub use error::ClientError;
pub use handler::Handler;
pub use manager::ConnectionManager;
pub use receiver::EventReceiver;
pub use selector::{ServerSelector, select_server};
pub use sender::Sender;
pub use state::{ClientEvent, ConnectionState, DisconnectReason};
