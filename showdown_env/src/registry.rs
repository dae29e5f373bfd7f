//! File-backed registry with a TCP liveness probe.
//!
//! The roster file is a JSON array of peers written by whoever provisions
//! the combatants:
//!
//! ```json
//! [
//!   {"name": "Doc",   "address": "127.0.0.1", "port": 50002},
//!   {"name": "Ringo", "address": "127.0.0.1", "port": 50003}
//! ]
//! ```
//!
//! The file is re-read on every query. A peer counts as running while its
//! port accepts connections; a combatant that shut down drops out. Peers
//! are probed concurrently, so one query takes about one probe timeout no
//! matter how many peers hang.

use crate::error::EnvError;
use crate::transport::Registry;
use crate::types::PeerRecord;
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Default time allowed for a liveness probe to connect.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Registry reading peers from a JSON roster file.
#[derive(Debug, Clone)]
pub struct RosterRegistry {
    path: PathBuf,
    probe_timeout: Duration,
}

impl RosterRegistry {
    /// Creates a registry over the roster at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Sets the liveness probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Returns the roster path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `peers` as a roster file at `path`.
    ///
    /// Writes to a sibling temp file first so readers never see a torn file.
    pub async fn write_roster(path: &Path, peers: &[PeerRecord]) -> Result<(), EnvError> {
        let json = serde_json::to_vec_pretty(peers)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<PeerRecord>, EnvError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| EnvError::network(format!("roster {}: {e}", self.path.display())))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn is_running(&self, peer: &PeerRecord) -> bool {
        let Some(endpoint) = peer.endpoint() else {
            // Unresolved entries are passed through; the caller decides.
            return true;
        };
        let addr = endpoint.to_string();
        match tokio::time::timeout(self.probe_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(peer = %peer.name, %addr, error = %e, "Probe refused");
                false
            }
            Err(_) => {
                debug!(peer = %peer.name, %addr, "Probe timed out");
                false
            }
        }
    }
}

#[async_trait]
impl Registry for RosterRegistry {
    async fn running_peers(&self, exclude: &str) -> Result<Vec<PeerRecord>, EnvError> {
        let peers: Vec<_> = self
            .load()
            .await?
            .into_iter()
            .filter(|p| p.name != exclude)
            .collect();
        let alive = join_all(peers.iter().map(|peer| self.is_running(peer))).await;
        Ok(peers
            .into_iter()
            .zip(alive)
            .filter_map(|(peer, alive)| alive.then_some(peer))
            .collect())
    }
}
