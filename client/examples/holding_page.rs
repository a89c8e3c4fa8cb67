use std::time::Duration;

use anyhow::Result;
use caelium_client::{ClientConfig, ServerSelector};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let selector = ServerSelector::from_config(&ClientConfig::from_env())?;

    let server = match selector.select().await {
        Some(server) => server,
        None => {
            println!("Server offline. Come back later, we will keep checking...");
            selector.wait_for_server(POLL_INTERVAL).await
        }
    };

    println!("Using {} ({})", server.name, server.url);
    Ok(())
}
