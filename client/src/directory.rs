//! Server directory access and caching.
//!
//! [`ServerDirectory`] keeps the last directory listing in memory and refetches
//! it when it is older than the refresh interval, empty, or explicitly forced.
//! Only one fetch runs at a time; callers arriving during a fetch get the
//! previous list immediately. A failed fetch keeps the previous list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use caelium_protocol::{ServerDescriptor, ServerErrorReport};

use crate::config::ClientConfig;

/// Remote side of the server directory
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Fetch the full list of server descriptors
    async fn fetch_servers(&self) -> Result<Vec<ServerDescriptor>>;

    /// Tell the backend that a server could not be reached
    async fn report_server_error(&self, server_id: u64) -> Result<()>;
}

/// Directory API over HTTP
#[derive(Debug, Clone)]
pub struct HttpDirectoryApi {
    client: reqwest::Client,
    servers_url: String,
    error_url: String,
}

impl HttpDirectoryApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            servers_url: config.servers_url(),
            error_url: config.server_error_url(),
        })
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn fetch_servers(&self) -> Result<Vec<ServerDescriptor>> {
        let response = self
            .client
            .get(&self.servers_url)
            .send()
            .await
            .context("Failed to request server directory")?
            .error_for_status()
            .context("Server directory request rejected")?;

        response
            .json()
            .await
            .context("Failed to parse server directory")
    }

    async fn report_server_error(&self, server_id: u64) -> Result<()> {
        self.client
            .post(&self.error_url)
            .json(&ServerErrorReport { server_id })
            .send()
            .await
            .context("Failed to send server error report")?
            .error_for_status()
            .context("Server error report rejected")?;
        Ok(())
    }
}

#[derive(Default)]
struct Snapshot {
    servers: Arc<Vec<ServerDescriptor>>,
    fetched_at: Option<Instant>,
}

struct DirectoryInner {
    api: Arc<dyn DirectoryApi>,
    refresh_interval: Duration,
    snapshot: RwLock<Snapshot>,
    refreshing: AtomicBool,
}

/// In-memory cache of the server directory.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct ServerDirectory {
    inner: Arc<DirectoryInner>,
}

impl ServerDirectory {
    pub fn new(api: Arc<dyn DirectoryApi>, refresh_interval: Duration) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                api,
                refresh_interval,
                snapshot: RwLock::new(Snapshot::default()),
                refreshing: AtomicBool::new(false),
            }),
        }
    }

    /// Directory backed by the HTTP API described by `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = HttpDirectoryApi::new(config)?;
        Ok(Self::new(Arc::new(api), config.directory_refresh_interval))
    }

    /// The cached list without triggering a fetch
    pub fn cached(&self) -> Arc<Vec<ServerDescriptor>> {
        self.inner
            .snapshot
            .read()
            .map(|s| Arc::clone(&s.servers))
            .unwrap_or_default()
    }

    /// Return the server list, refetching it first if it is stale or `force` is set
    pub async fn get_servers(&self, force: bool) -> Arc<Vec<ServerDescriptor>> {
        let (cached, stale) = self.inspect();
        if !force && !stale {
            return cached;
        }

        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Directory refresh in flight, serving cached list");
            return cached;
        }
        let _refreshing = RefreshGuard(&self.inner.refreshing);

        match self.inner.api.fetch_servers().await {
            Ok(servers) => {
                tracing::debug!(count = servers.len(), "Server directory refreshed");
                let servers = Arc::new(servers);
                if let Ok(mut snapshot) = self.inner.snapshot.write() {
                    *snapshot = Snapshot {
                        servers: Arc::clone(&servers),
                        fetched_at: Some(Instant::now()),
                    };
                }
                servers
            }
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::warn!(%error, "Server directory fetch failed, keeping cached list");
                self.cached()
            }
        }
    }

    /// Make the next `get_servers` call bypass the cache
    pub fn invalidate(&self) {
        if let Ok(mut snapshot) = self.inner.snapshot.write() {
            snapshot.fetched_at = None;
        }
    }

    /// Reset the cache timestamp and refetch
    pub async fn refresh(&self) -> Arc<Vec<ServerDescriptor>> {
        self.invalidate();
        self.get_servers(false).await
    }

    /// Report an unreachable server.
    ///
    /// On success the cache is invalidated. Failures are logged and never
    /// returned.
    pub async fn report_server_error(&self, server_id: u64) {
        match self.inner.api.report_server_error(server_id).await {
            Ok(()) => {
                tracing::info!(server_id, "Reported unreachable server");
                self.invalidate();
            }
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::warn!(server_id, %error, "Failed to report unreachable server");
            }
        }
    }

    fn inspect(&self) -> (Arc<Vec<ServerDescriptor>>, bool) {
        match self.inner.snapshot.read() {
            Ok(snapshot) => {
                let expired = snapshot
                    .fetched_at
                    .is_none_or(|at| at.elapsed() >= self.inner.refresh_interval);
                (
                    Arc::clone(&snapshot.servers),
                    expired || snapshot.servers.is_empty(),
                )
            }
            Err(_) => (Arc::default(), true),
        }
    }
}

/// Clears the in-flight flag even if the refreshing future is dropped
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
