use std::sync::Arc;
use std::time::Duration;

use crate::membership::directory::Directory;
use crate::replication::protocol::{ENDPOINT_VIEW, PROBE_TIMEOUT};

/// How long the detector waits between probe rounds.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(45);

/// Periodically probes every known peer and updates the directory's alive
/// set.
///
/// A probe is a plain list-views request; a 200 marks the peer alive,
/// anything else (including a connection error or timeout) marks it dead.
/// Dead peers stay in the known list so they remain reachable as forwarding
/// targets if they recover. The resulting liveness view is local to this
/// node and is never broadcast.
pub struct FailureDetector {
    directory: Arc<Directory>,
    client: reqwest::Client,
    interval: Duration,
}

impl FailureDetector {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self::with_interval(directory, PROBE_INTERVAL)
    }

    pub fn with_interval(directory: Arc<Directory>, interval: Duration) -> Self {
        Self {
            directory,
            client: reqwest::Client::new(),
            interval,
        }
    }

    /// Runs the probe loop forever. Spawned as a background task at boot so
    /// it never blocks request handling.
    pub async fn run(self) {
        tracing::info!("failure detector started");
        loop {
            tokio::time::sleep(self.interval).await;
            self.probe_round().await;
        }
    }

    /// One pass over every known peer.
    pub async fn probe_round(&self) {
        for peer in self.directory.peers().await {
            match self.probe(&peer).await {
                Ok(true) => self.directory.mark_alive(&peer).await,
                Ok(false) | Err(_) => {
                    tracing::warn!("view {} is no longer reachable", peer);
                    self.directory.mark_dead(&peer).await;
                }
            }
        }
    }

    async fn probe(&self, peer: &str) -> reqwest::Result<bool> {
        let response = self
            .client
            .get(format!("http://{}{}", peer, ENDPOINT_VIEW))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }
}
