use thiserror::Error;

pub mod client;
pub mod directory;
pub mod server;

pub use client::ClientCommand;
pub use directory::{ServerDescriptor, ServerErrorReport};
pub use server::{NewMessage, PresenceStatus, ServerEvent, parse_server_event};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown event category: {0}")]
    UnknownCategory(String),

    #[error("Invalid {category} event: {reason}")]
    InvalidFormat { category: String, reason: String },
}
