//! Realtime connection manager.
//!
//! Owns at most one authenticated socket at a time. A driver task runs the
//! [`ConnectionState`] machine: it opens the socket, decodes inbound frames,
//! forwards outbound text, and after an unplanned close waits
//! [`ClientConfig::reconnect_delay`] before a single new attempt. Every close
//! schedules exactly one more attempt, without bound. Shutdown (or dropping
//! the manager) closes the socket and cancels a pending attempt without
//! reconnecting.

use std::sync::Arc;

use caelium_protocol::{ClientCommand, parse_server_event};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::receiver::EventReceiver;
use crate::sender::Sender;
use crate::state::{ClientEvent, ConnectionState, DisconnectReason};

struct DriverHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the realtime session for one account: at most one socket, reconnects
/// after unplanned closes
pub struct ConnectionManager {
    config: Arc<ClientConfig>,
    tokens: Arc<dyn TokenStore>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: broadcast::Sender<ClientEvent>,
    sender: Sender,
    outgoing_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    driver: Mutex<Option<DriverHandle>>,
}

impl ConnectionManager {
    /// Create an idle manager; nothing connects until [`connect`](Self::connect)
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        Self {
            config: Arc::new(config),
            tokens,
            state_tx: Arc::new(state_tx),
            events_tx,
            sender: Sender::new(outgoing_tx, state_rx),
            outgoing_rx: Arc::new(Mutex::new(outgoing_rx)),
            driver: Mutex::new(None),
        }
    }

    /// Start the realtime session.
    ///
    /// Returns `false` without doing anything when no access token is stored.
    /// Returns `true` if a session was started or is already running. A session
    /// that is closing counts as finished: `connect` waits for it to exit and
    /// then starts a new one.
    pub async fn connect(&self) -> bool {
        let mut driver = self.driver.lock().await;

        if let Some(handle) = driver.as_ref()
            && !handle.task.is_finished()
            && matches!(
                self.state(),
                ConnectionState::Connecting
                    | ConnectionState::Open
                    | ConnectionState::ReconnectPending
            )
        {
            tracing::debug!(state = %self.state(), "Realtime session already running");
            return true;
        }

        // Whatever is left is closing or gave up after losing its token.
        if let Some(previous) = driver.take() {
            tracing::debug!(state = %self.state(), "Waiting for previous session to exit");
            let _ = previous.shutdown_tx.send(());
            if let Err(e) = previous.task.await {
                tracing::warn!(error = %e, "Connection driver did not exit cleanly");
            }
            self.state_tx.send_replace(ConnectionState::Idle);
        }

        let Some(token) = self.tokens.access_token() else {
            tracing::debug!("No access token stored, not connecting");
            return false;
        };

        // The previous driver has exited, so its guard is released.
        let Ok(outgoing) = Arc::clone(&self.outgoing_rx).try_lock_owned() else {
            tracing::warn!("Outgoing queue still held by another session, not connecting");
            return false;
        };

        // Claim the session before the task is scheduled so a second call
        // sees it as running.
        self.state_tx.send_replace(ConnectionState::Connecting);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let session = Driver {
            config: Arc::clone(&self.config),
            tokens: Arc::clone(&self.tokens),
            state_tx: Arc::clone(&self.state_tx),
            events_tx: self.events_tx.clone(),
            outgoing,
            shutdown: shutdown_rx,
        };

        let task = tokio::spawn(session.run(token));
        *driver = Some(DriverHandle { shutdown_tx, task });
        true
    }

    /// Close the socket and cancel any pending reconnect
    pub async fn shutdown(&self) {
        // Held until the state is reset, so a concurrent `connect` starts its
        // session only after this one is gone.
        let mut driver = self.driver.lock().await;

        if let Some(DriverHandle { shutdown_tx, task }) = driver.take() {
            let _ = shutdown_tx.send(());
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Connection driver did not exit cleanly");
            }
        }

        self.state_tx.send_replace(ConnectionState::Idle);
    }

    /// Current session state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Whether the socket is open right now
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Observe state transitions, e.g. to gate chat rendering until open
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to events arriving from now on
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.events_tx.subscribe())
    }

    /// Cloneable handle for sending from other tasks
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Serialize and transmit `payload`; returns `Ok(false)` if it was dropped
    /// because the socket is not open
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool, ClientError> {
        self.sender.send(payload)
    }

    pub fn send_command(&self, command: &ClientCommand) -> bool {
        self.sender.send_command(command)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.get_mut().take() {
            let _ = handle.shutdown_tx.send(());
        }
        self.state_tx.send_replace(ConnectionState::Idle);
    }
}

enum SessionEnd {
    Shutdown,
    Dropped(DisconnectReason),
}

/// Owns the socket for the lifetime of one `connect` call
struct Driver {
    config: Arc<ClientConfig>,
    tokens: Arc<dyn TokenStore>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: broadcast::Sender<ClientEvent>,
    outgoing: OwnedMutexGuard<mpsc::UnboundedReceiver<String>>,
    shutdown: oneshot::Receiver<()>,
}

impl Driver {
    async fn run(mut self, mut token: String) {
        self.discard_outgoing();

        loop {
            self.transition(ConnectionState::Connecting);
            let url = self.config.socket_url(&token);

            let attempt = tokio::select! {
                biased;
                _ = &mut self.shutdown => {
                    self.transition(ConnectionState::Idle);
                    return;
                }
                result = Connection::connect(&url, self.config.connect_timeout) => result,
            };

            match attempt {
                Ok(connection) => {
                    self.transition(ConnectionState::Open);
                    tracing::info!("Realtime connection open");
                    self.emit(ClientEvent::Connected);

                    match self.run_session(connection).await {
                        SessionEnd::Shutdown => {
                            self.transition(ConnectionState::Idle);
                            tracing::info!("Realtime connection closed");
                            return;
                        }
                        SessionEnd::Dropped(reason) => {
                            self.transition(ConnectionState::ReconnectPending);
                            tracing::warn!(%reason, "Realtime connection lost");
                            self.emit(ClientEvent::Disconnected(reason));
                        }
                    }
                }
                Err(e) => {
                    self.transition(ConnectionState::ReconnectPending);
                    let error = format!("{:#}", e);
                    tracing::warn!(%error, "Realtime connection failed");
                }
            }

            self.discard_outgoing();

            let delay = self.config.reconnect_delay;
            tracing::debug!(?delay, "Reconnect scheduled");

            tokio::select! {
                biased;
                _ = &mut self.shutdown => {
                    self.transition(ConnectionState::Idle);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.tokens.access_token() {
                Some(next) => token = next,
                None => {
                    tracing::info!("Access token gone, not reconnecting");
                    self.transition(ConnectionState::Idle);
                    return;
                }
            }
        }
    }

    async fn run_session(&mut self, mut connection: Connection) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                _ = &mut self.shutdown => {
                    self.transition(ConnectionState::Closing);
                    if let Err(e) = connection.close().await {
                        tracing::debug!(error = %e, "Close handshake failed");
                    }
                    return SessionEnd::Shutdown;
                }
                inbound = connection.next_text() => match inbound {
                    Ok(Some(text)) => self.dispatch(&text),
                    Ok(None) => return SessionEnd::Dropped(DisconnectReason::ClosedByServer),
                    Err(e) => {
                        return SessionEnd::Dropped(DisconnectReason::Transport(format!("{:#}", e)));
                    }
                },
                Some(text) = self.outgoing.recv() => {
                    if let Err(e) = connection.send_text(text).await {
                        return SessionEnd::Dropped(DisconnectReason::Transport(format!("{:#}", e)));
                    }
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match parse_server_event(text) {
            Ok(event) => {
                tracing::trace!(category = event.category(), "Inbound event");
                // No subscribers is not an error
                let _ = self.events_tx.send(ClientEvent::Server(event));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed frame");
            }
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events_tx.send(event);
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Connection state changed");
        }
    }

    /// Payloads accepted just before a drop are never replayed
    fn discard_outgoing(&mut self) {
        let mut dropped = 0usize;
        while self.outgoing.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "Discarded messages queued while the socket closed");
        }
    }
}
