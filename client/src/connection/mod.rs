use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Low-level WebSocket connection handler
pub(crate) struct Connection {
    ws: WsStream,
}

impl Connection {
    /// Connect to a WebSocket URL, giving up after `timeout`
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .context("WebSocket handshake timed out")?
            .context("Failed to connect to WebSocket")?;

        Ok(Self { ws })
    }

    /// Receive the next text frame; `None` once the peer has closed
    pub async fn next_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.ws.next().await {
            let message = message.context("WebSocket error")?;

            match message {
                Message::Text(text) => return Ok(Some(text)),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "Received close frame");
                    return Ok(None);
                }
                Message::Ping(data) => self.ws.send(Message::Pong(data)).await?,
                Message::Binary(data) => {
                    tracing::debug!(len = data.len(), "Ignoring binary frame");
                }
                _ => {}
            }
        }

        Ok(None)
    }

    /// Send a text frame
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text))
            .await
            .context("Failed to send message")
    }

    /// Start a close handshake at our request
    pub async fn close(&mut self) -> Result<()> {
        self.ws.close(None).await.context("Failed to close WebSocket")
    }
}
