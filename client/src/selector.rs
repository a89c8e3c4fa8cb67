//! Weighted random server selection and failover.

use std::time::Duration;

use anyhow::Result;
use caelium_protocol::ServerDescriptor;
use rand::Rng;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::directory::ServerDirectory;

/// Pick a server with probability proportional to its weight.
///
/// Only active servers with a non-zero weight take part. Returns `None` when
/// there are none; callers show the offline page in that case.
pub fn select_server<'a, R: Rng>(
    servers: &'a [ServerDescriptor],
    rng: &mut R,
) -> Option<&'a ServerDescriptor> {
    let total: u64 = servers
        .iter()
        .filter(|s| s.is_selectable())
        .map(|s| u64::from(s.weight))
        .sum();

    if total == 0 {
        return None;
    }

    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u64;

    servers.iter().filter(|s| s.is_selectable()).find(|s| {
        cumulative += u64::from(s.weight);
        cumulative > draw
    })
}

/// Chooses the backend origin to target, backed by a [`ServerDirectory`]
#[derive(Clone)]
pub struct ServerSelector {
    directory: ServerDirectory,
}

impl ServerSelector {
    pub fn new(directory: ServerDirectory) -> Self {
        Self { directory }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(ServerDirectory::from_config(config)?))
    }

    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    /// Select a server from the (possibly refreshed) directory
    pub async fn select(&self) -> Option<ServerDescriptor> {
        let servers = self.directory.get_servers(false).await;
        let picked = select_server(&servers, &mut rand::thread_rng()).cloned();

        match &picked {
            Some(server) => {
                tracing::debug!(server_id = server.id, url = %server.url, "Selected server");
            }
            None => tracing::warn!("No active servers available"),
        }
        picked
    }

    /// Report `server` as unreachable without waiting for the report
    pub fn report_unreachable(&self, server: &ServerDescriptor) -> JoinHandle<()> {
        let directory = self.directory.clone();
        let server_id = server.id;
        tokio::spawn(async move { directory.report_server_error(server_id).await })
    }

    /// Report `failed`, refresh the directory and pick another server
    pub async fn fail_over(&self, failed: &ServerDescriptor) -> Option<ServerDescriptor> {
        self.directory.report_server_error(failed.id).await;

        let servers = self.directory.refresh().await;
        let candidates: Vec<ServerDescriptor> = servers
            .iter()
            .filter(|s| s.id != failed.id)
            .cloned()
            .collect();

        let picked = select_server(&candidates, &mut rand::thread_rng()).cloned();
        if picked.is_none() {
            tracing::warn!(failed_id = failed.id, "No server to fail over to");
        }
        picked
    }

    /// Poll the directory until a server is available.
    ///
    /// This is what the offline holding page runs; drop the future to stop
    /// polling.
    pub async fn wait_for_server(&self, poll_interval: Duration) -> ServerDescriptor {
        let mut polls = 0u64;
        loop {
            let servers = self.directory.refresh().await;
            let picked = select_server(&servers, &mut rand::thread_rng()).cloned();

            if let Some(server) = picked {
                tracing::info!(server_id = server.id, polls, "Server available again");
                return server;
            }

            polls += 1;
            tracing::debug!(polls, ?poll_interval, "No active servers, polling again");
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn server(id: u64, weight: u32, active: bool) -> ServerDescriptor {
        ServerDescriptor {
            id,
            name: format!("server-{}", id),
            url: format!("https://s{}.caelium.app", id),
            weight,
            created_at: String::new(),
            capacity: 100,
            active_status: active,
            release_update: false,
            updated_at: String::new(),
        }
    }

    fn frequencies(servers: &[ServerDescriptor], draws: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = vec![0usize; servers.len()];

        for _ in 0..draws {
            let picked = select_server(servers, &mut rng).unwrap();
            let index = servers.iter().position(|s| s.id == picked.id).unwrap();
            counts[index] += 1;
        }

        counts.iter().map(|&c| c as f64 / draws as f64).collect()
    }

    #[test]
    fn test_weights_one_to_three() {
        let servers = vec![server(1, 1, true), server(2, 3, true)];
        let freq = frequencies(&servers, 10_000);

        assert!((freq[1] - 0.75).abs() < 0.02, "weight-3 share was {}", freq[1]);
    }

    #[test]
    fn test_weighting_ignores_list_order() {
        let servers = vec![server(2, 3, true), server(1, 1, true)];
        let freq = frequencies(&servers, 10_000);

        assert!((freq[0] - 0.75).abs() < 0.02, "weight-3 share was {}", freq[0]);
    }

    #[test]
    fn test_equal_weights_are_uniform() {
        let servers = vec![server(1, 2, true), server(2, 2, true), server(3, 2, true)];
        let freq = frequencies(&servers, 9_000);

        for share in freq {
            assert!((share - 1.0 / 3.0).abs() < 0.03, "share was {}", share);
        }
    }

    #[test]
    fn test_single_active_server_always_selected() {
        let servers = vec![server(1, 5, false), server(2, 1, true), server(3, 9, false)];
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..200 {
            assert_eq!(select_server(&servers, &mut rng).unwrap().id, 2);
        }
    }

    #[test]
    fn test_no_active_servers() {
        let servers = vec![server(1, 5, false), server(2, 1, false)];
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            assert!(select_server(&servers, &mut rng).is_none());
        }
        assert!(select_server(&[], &mut rng).is_none());
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let servers = vec![server(1, 0, true), server(2, 4, true), server(3, 0, true)];
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..1_000 {
            assert_eq!(select_server(&servers, &mut rng).unwrap().id, 2);
        }
    }

    #[test]
    fn test_all_zero_weights_is_no_server() {
        let servers = vec![server(1, 0, true), server(2, 0, true)];
        let mut rng = StdRng::seed_from_u64(3);

        assert!(select_server(&servers, &mut rng).is_none());
    }
}
