use serde::Serialize;

/// Commands that clients can send over the realtime socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ClientCommand {
    /// {"category":"typing","chat_id":CHAT}
    Typing { chat_id: u64 },

    /// {"category":"new_message","chat_id":CHAT,"content":TEXT}
    NewMessage {
        chat_id: u64,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
}

impl ClientCommand {
    /// Serialize command to a JSON text frame
    pub fn to_wire_format(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
