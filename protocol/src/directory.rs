//! Server directory records served by the core API.

use serde::{Deserialize, Serialize};

/// One backend origin listed in the server directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub url: String,
    /// Relative share of traffic; zero means never selected
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub capacity: u64,
    #[serde(default)]
    pub active_status: bool,
    #[serde(default)]
    pub release_update: bool,
    #[serde(default)]
    pub updated_at: String,
}

impl ServerDescriptor {
    /// Whether this server can receive traffic at all
    pub fn is_selectable(&self) -> bool {
        self.active_status && self.weight > 0
    }
}

/// Body posted to the error handler when a server is unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorReport {
    pub server_id: u64,
}
