use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "https://api.caelium.app";
pub const DEFAULT_WS_HOST: &str = "wss://api.caelium.app";

const SERVERS_PATH: &str = "/api/core/servers/";
const SERVER_ERROR_PATH: &str = "/api/core/public_server_error_handler/";

/// Endpoints and timings shared by the connection manager and server directory
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash
    pub api_host: String,
    /// Base URL of the realtime endpoint (`ws://` or `wss://`)
    pub ws_host: String,
    /// Delay between an unplanned close and the next connect attempt
    pub reconnect_delay: Duration,
    /// Upper bound on a single websocket handshake
    pub connect_timeout: Duration,
    /// Upper bound on a single directory HTTP request
    pub request_timeout: Duration,
    /// Age after which the cached server list is refetched
    pub directory_refresh_interval: Duration,
    /// Buffer size of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            ws_host: DEFAULT_WS_HOST.to_string(),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            directory_refresh_interval: Duration::from_secs(10 * 60),
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Build a config from defaults overridden by `CAELIUM_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("CAELIUM_API_HOST") {
            config.api_host = host;
        }
        if let Ok(host) = std::env::var("CAELIUM_WS_HOST") {
            config.ws_host = host;
        }
        if let Some(ms) = env_u64("CAELIUM_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("CAELIUM_DIRECTORY_REFRESH_SECS") {
            config.directory_refresh_interval = Duration::from_secs(secs);
        }

        config
    }

    /// `<ws-host>/ws/base/<token>/`
    pub fn socket_url(&self, access_token: &str) -> String {
        format!("{}/ws/base/{}/", trim_host(&self.ws_host), access_token)
    }

    pub fn servers_url(&self) -> String {
        format!("{}{}", trim_host(&self.api_host), SERVERS_PATH)
    }

    pub fn server_error_url(&self) -> String {
        format!("{}{}", trim_host(&self.api_host), SERVER_ERROR_PATH)
    }
}

fn trim_host(host: &str) -> &str {
    host.trim_end_matches('/')
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring non-numeric environment override");
            None
        }
    }
}
