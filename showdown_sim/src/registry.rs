//! In-memory service discovery for the arena.

use async_trait::async_trait;
use showdown_env::{CancellationToken, EnvError, PeerRecord, Registry};
use std::sync::{Mutex, PoisonError};

/// Registry over the arena's combatants.
///
/// A combatant counts as running until its shutdown token is cancelled,
/// which mirrors a process that exits once it is dead or has won.
#[derive(Default)]
pub struct SimRegistry {
    entries: Mutex<Vec<(PeerRecord, CancellationToken)>>,
}

impl SimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `record` for as long as `token` is not cancelled.
    pub fn register(&self, record: PeerRecord, token: CancellationToken) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((record, token));
    }

    /// Names of the combatants still running.
    pub fn running(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, token)| !token.is_cancelled())
            .map(|(record, _)| record.name.clone())
            .collect()
    }
}

#[async_trait]
impl Registry for SimRegistry {
    async fn running_peers(&self, exclude: &str) -> Result<Vec<PeerRecord>, EnvError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|(record, token)| record.name != exclude && !token.is_cancelled())
            .map(|(record, _)| record.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showdown_env::Endpoint;

    #[tokio::test]
    async fn test_excludes_self_and_stopped() {
        let registry = SimRegistry::new();
        let doc = CancellationToken::new();
        let ringo = CancellationToken::new();
        let billy = CancellationToken::new();
        registry.register(PeerRecord::resolved("Doc", &Endpoint::new("10.0.0.1", 50002)), doc);
        registry.register(PeerRecord::resolved("Ringo", &Endpoint::new("10.0.0.2", 50003)), ringo);
        registry.register(PeerRecord::resolved("Billy", &Endpoint::new("10.0.0.3", 50004)), billy.clone());

        billy.cancel();

        let peers = registry.running_peers("Doc").await.unwrap();
        let names: Vec<_> = peers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ringo"]);
        assert_eq!(registry.running(), vec!["Doc", "Ringo"]);
    }
}
