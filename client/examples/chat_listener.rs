use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use caelium_client::{
    ClientConfig, ConnectionManager, DisconnectReason, FileTokenStore, Handler, NewMessage,
    PresenceStatus,
};
use tracing_subscriber::EnvFilter;

struct Printer;

#[async_trait]
impl Handler for Printer {
    async fn on_connected(&mut self) {
        println!("Connected.");
    }

    async fn on_disconnected(&mut self, reason: &DisconnectReason) {
        println!("Disconnected ({}), reconnecting...", reason);
    }

    async fn on_online_users(&mut self, user_ids: &[u64]) {
        println!("Online: {:?}", user_ids);
    }

    async fn on_status_update(&mut self, user_id: u64, status: PresenceStatus) {
        println!("User {} is now {:?}", user_id, status);
    }

    async fn on_typing(&mut self, chat_id: u64, user_id: u64) {
        println!("[chat {}] user {} is typing", chat_id, user_id);
    }

    async fn on_new_message(&mut self, message: &NewMessage) {
        match &message.file {
            Some(file) => println!(
                "[chat {}] {}: {} ({})",
                message.chat_id, message.sender_id, message.content, file
            ),
            None => println!(
                "[chat {}] {}: {}",
                message.chat_id, message.sender_id, message.content
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let storage =
        std::env::var("CAELIUM_STORAGE").unwrap_or_else(|_| "caelium-storage.json".to_string());
    let tokens = Arc::new(FileTokenStore::new(storage));
    let manager = ConnectionManager::new(ClientConfig::from_env(), tokens);

    let mut events = manager.subscribe();
    if !manager.connect().await {
        println!("No access token stored; log in first.");
        return Ok(());
    }

    let mut printer = Printer;
    tokio::select! {
        _ = events.run(&mut printer) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Shutting down...");
        }
    }

    manager.shutdown().await;
    Ok(())
}
