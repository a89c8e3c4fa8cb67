use caelium_protocol::ClientCommand;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::error::ClientError;
use crate::state::ConnectionState;

/// Cloneable handle for sending messages to the server.
///
/// Nothing is buffered while the socket is down: a send that finds the
/// connection anything but open is dropped and reported as `false`.
#[derive(Clone)]
pub struct Sender {
    outgoing: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ConnectionState>,
}

impl Sender {
    pub(crate) fn new(
        outgoing: mpsc::UnboundedSender<String>,
        state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { outgoing, state }
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }

    /// Serialize `payload` to JSON and send it if the socket is open
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool, ClientError> {
        if !self.is_open() {
            self.log_dropped();
            return Ok(false);
        }

        let text = serde_json::to_string(payload)?;
        Ok(self.send_text(text))
    }

    pub fn send_command(&self, command: &ClientCommand) -> bool {
        if !self.is_open() {
            self.log_dropped();
            return false;
        }
        match command.to_wire_format() {
            Ok(text) => self.send_text(text),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode command, message dropped");
                false
            }
        }
    }

    /// Notify a chat that the user is typing
    pub fn send_typing(&self, chat_id: u64) -> bool {
        self.send_command(&ClientCommand::Typing { chat_id })
    }

    /// Send a chat message
    pub fn send_chat(&self, chat_id: u64, content: &str) -> bool {
        self.send_command(&ClientCommand::NewMessage {
            chat_id,
            content: content.to_string(),
            file: None,
        })
    }

    fn send_text(&self, text: String) -> bool {
        if self.outgoing.send(text).is_err() {
            tracing::warn!("Connection manager gone, message dropped");
            return false;
        }
        true
    }

    fn log_dropped(&self) {
        let state = *self.state.borrow();
        tracing::warn!(%state, "Socket not open, message dropped");
    }
}
