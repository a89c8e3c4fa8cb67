use caelium_protocol::ServerEvent;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::handler::Handler;
use crate::state::ClientEvent;

/// Receives events from the connection manager and dispatches them to a handler.
pub struct EventReceiver {
    incoming: broadcast::Receiver<ClientEvent>,
}

impl EventReceiver {
    pub(crate) fn new(incoming: broadcast::Receiver<ClientEvent>) -> Self {
        Self { incoming }
    }

    /// Next event in arrival order; `None` once the manager is gone.
    ///
    /// A receiver that falls behind skips what it missed rather than
    /// receiving it late.
    pub async fn recv(&mut self) -> Option<ClientEvent> {
        loop {
            match self.incoming.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event receiver lagged, events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Run the event loop, dispatching events to the handler.
    ///
    /// This will run until the connection manager is dropped.
    pub async fn run<H: Handler>(&mut self, handler: &mut H) {
        while let Some(event) = self.recv().await {
            dispatch_event(handler, event).await;
        }
    }
}

/// Dispatch a single event to the appropriate handler method
async fn dispatch_event<H: Handler>(handler: &mut H, event: ClientEvent) {
    match event {
        ClientEvent::Connected => handler.on_connected().await,
        ClientEvent::Disconnected(reason) => handler.on_disconnected(&reason).await,
        ClientEvent::Server(ServerEvent::OnlineUsers { online_users }) => {
            handler.on_online_users(&online_users).await;
        }
        ClientEvent::Server(ServerEvent::StatusUpdate { user_id, status }) => {
            handler.on_status_update(user_id, status).await;
        }
        ClientEvent::Server(ServerEvent::Typing { chat_id, user_id }) => {
            handler.on_typing(chat_id, user_id).await;
        }
        ClientEvent::Server(ServerEvent::NewMessage(message)) => {
            handler.on_new_message(&message).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use caelium_protocol::{NewMessage, PresenceStatus};

    use crate::state::DisconnectReason;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    #[async_trait]
    impl Handler for Recorder {
        async fn on_connected(&mut self) {
            self.seen.push("connected".to_string());
        }

        async fn on_disconnected(&mut self, reason: &DisconnectReason) {
            self.seen.push(format!("disconnected: {}", reason));
        }

        async fn on_status_update(&mut self, user_id: u64, status: PresenceStatus) {
            self.seen.push(format!("status {} {:?}", user_id, status));
        }

        async fn on_new_message(&mut self, message: &NewMessage) {
            self.seen.push(format!("message {}", message.content));
        }
    }

    #[tokio::test]
    async fn test_run_dispatches_in_order_until_closed() {
        let (tx, rx) = broadcast::channel(16);
        let mut receiver = EventReceiver::new(rx);

        tx.send(ClientEvent::Connected).unwrap();
        tx.send(ClientEvent::Server(ServerEvent::StatusUpdate {
            user_id: 2,
            status: PresenceStatus::Online,
        }))
        .unwrap();
        tx.send(ClientEvent::Server(ServerEvent::Typing { chat_id: 1, user_id: 2 }))
            .unwrap();
        tx.send(ClientEvent::Server(ServerEvent::NewMessage(NewMessage {
            chat_id: 1,
            sender_id: 2,
            content: "hey".to_string(),
            file: None,
        })))
        .unwrap();
        tx.send(ClientEvent::Disconnected(DisconnectReason::ClosedByServer))
            .unwrap();
        drop(tx);

        let mut recorder = Recorder::default();
        receiver.run(&mut recorder).await;

        assert_eq!(
            recorder.seen,
            vec![
                "connected",
                "status 2 Online",
                "message hey",
                "disconnected: closed by server",
            ]
        );
    }

    #[tokio::test]
    async fn test_recv_skips_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        let mut receiver = EventReceiver::new(rx);

        for chat_id in 0..5 {
            tx.send(ClientEvent::Server(ServerEvent::Typing { chat_id, user_id: 1 }))
                .unwrap();
        }

        assert_eq!(
            receiver.recv().await,
            Some(ClientEvent::Server(ServerEvent::Typing { chat_id: 3, user_id: 1 }))
        );
    }
}
