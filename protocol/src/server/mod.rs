mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DecodeError;

/// Presence reported for a single user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// A chat message pushed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub chat_id: u64,
    pub sender_id: u64,
    pub content: String,
    /// Reference to an attached file, if the message carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Events pushed over the realtime socket, discriminated by `category`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Snapshot of every user currently online
    OnlineUsers { online_users: Vec<u64> },

    /// A single user went online or offline
    StatusUpdate { user_id: u64, status: PresenceStatus },

    /// A user is typing in a chat
    Typing { chat_id: u64, user_id: u64 },

    NewMessage(NewMessage),
}

impl ServerEvent {
    pub const CATEGORIES: [&'static str; 4] =
        ["online_users", "status_update", "typing", "new_message"];

    pub fn category(&self) -> &'static str {
        match self {
            Self::OnlineUsers { .. } => "online_users",
            Self::StatusUpdate { .. } => "status_update",
            Self::Typing { .. } => "typing",
            Self::NewMessage(_) => "new_message",
        }
    }
}

/// Decode a text frame from the realtime socket into a ServerEvent
pub fn parse_server_event(frame: &str) -> Result<ServerEvent, DecodeError> {
    let value: Value = serde_json::from_str(frame)?;

    let category = value
        .get("category")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingField("category".to_string()))?
        .to_string();

    if !ServerEvent::CATEGORIES.contains(&category.as_str()) {
        return Err(DecodeError::UnknownCategory(category));
    }

    serde_json::from_value(value).map_err(|e| DecodeError::InvalidFormat {
        category,
        reason: e.to_string(),
    })
}
