//! Arena - the simulation harness container.
//!
//! Runs a set of combatants to completion inside one tokio runtime. Each
//! combatant gets the real control loop, the simulated registry and
//! network, and a shared journal written to disk.

use crate::context::SimContext;
use crate::network::SimNetwork;
use crate::registry::SimRegistry;

use serde::Serialize;
use showdown_core::{
    AttackService, CombatLoop, Combatant, CombatantSpec, Ending, Journal, JournalService, LoopConfig,
    Phase,
};
use showdown_env::{ArenaContext, CancellationToken, Endpoint, PeerRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// First attack port; combatant `i` listens on `BASE_PORT + i`.
pub const BASE_PORT: u16 = 50002;

type SimLoop = CombatLoop<SimContext, SimRegistry, SimNetwork, JournalService>;

/// Configuration for an arena run.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Master seed for target selection and faults
    pub seed: u64,

    /// Probability of an attack being dropped
    pub loss_rate: f64,

    /// Combat loop timing
    pub loop_config: LoopConfig,

    /// Real-time bound on the whole fight; survivors are interrupted after it
    pub max_wall_time: Duration,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            loss_rate: 0.0,
            loop_config: LoopConfig::default(),
            max_wall_time: Duration::from_secs(30),
        }
    }
}

/// Final state of one combatant.
#[derive(Debug, Clone, Serialize)]
pub struct CombatantReport {
    pub name: String,
    pub endpoint: String,
    pub phase: Phase,
    pub health: u64,
}

/// Outcome of an arena run.
#[derive(Debug, Clone, Serialize)]
pub struct ArenaReport {
    pub seed: u64,
    pub winner: Option<String>,
    pub combatants: Vec<CombatantReport>,
    pub attacks_delivered: u64,
    pub attacks_dropped: u64,
    pub virtual_time_secs: f64,
    pub journal_records: usize,
    pub journal_bytes: u64,
}

impl ArenaReport {
    /// Combatants that ended with `ending`.
    pub fn with_ending(&self, ending: Ending) -> impl Iterator<Item = &CombatantReport> {
        self.combatants
            .iter()
            .filter(move |c| c.phase == Phase::Terminated(ending))
    }
}

/// The arena - container for one simulated fight.
pub struct Arena {
    config: ArenaConfig,
    context: Arc<SimContext>,
    registry: Arc<SimRegistry>,
    network: Arc<SimNetwork>,
    journal: Arc<JournalService>,
    entrants: Vec<(Arc<Combatant>, Endpoint)>,
}

impl Arena {
    /// Creates an empty arena writing to `journal`.
    pub fn new(config: ArenaConfig, journal: Arc<Journal>) -> Self {
        // Separate streams for targeting and faults
        let context = SimContext::shared(config.seed);
        let network = SimNetwork::new(config.seed.wrapping_mul(0x9e37_79b9_7f4a_7c15)).with_loss_rate(config.loss_rate);

        Self {
            config,
            context,
            registry: Arc::new(SimRegistry::new()),
            network: Arc::new(network),
            journal: Arc::new(JournalService::new(journal)),
            entrants: Vec::new(),
        }
    }

    /// Adds a combatant and returns its endpoint.
    pub fn enter(&mut self, spec: &CombatantSpec) -> Endpoint {
        let index = self.entrants.len();
        let endpoint = Endpoint::new(format!("10.0.0.{}", index + 1), BASE_PORT + index as u16);
        self.entrants.push((Arc::new(Combatant::from_spec(spec)), endpoint.clone()));
        endpoint
    }

    pub fn context(&self) -> &Arc<SimContext> {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.entrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }

    /// Runs every combatant until each has terminated.
    pub async fn run(self) -> ArenaReport {
        let mut loops: Vec<(Arc<SimLoop>, Endpoint)> = Vec::with_capacity(self.entrants.len());

        // Everyone is listening and registered before the first tick.
        for (combatant, endpoint) in &self.entrants {
            let combat = Arc::new(CombatLoop::new(
                combatant.clone(),
                self.context.clone(),
                self.registry.clone(),
                self.network.clone(),
                self.journal.clone(),
                self.config.loop_config,
            ));
            self.network
                .listen(endpoint.clone(), AttackService::new(combatant.clone()));
            self.registry.register(
                PeerRecord::resolved(combatant.name(), endpoint),
                combat.token().clone(),
            );
            loops.push((combat, endpoint.clone()));
        }

        info!(seed = self.config.seed, combatants = loops.len(), "Arena started");

        let mut fights = JoinSet::new();
        for (combat, endpoint) in &loops {
            let combat = combat.clone();
            let endpoint = endpoint.clone();
            let network = self.network.clone();
            fights.spawn(async move {
                let phase = combat.run().await;
                // The process exits: its attack server goes away.
                network.shutdown(&endpoint);
                phase
            });
        }

        let everyone: Vec<CancellationToken> = loops.iter().map(|(c, _)| c.token().clone()).collect();
        let drained = tokio::time::timeout(self.config.max_wall_time, async {
            while fights.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(survivors = ?self.registry.running(), "Arena timed out, interrupting survivors");
            for token in &everyone {
                token.cancel();
            }
            while fights.join_next().await.is_some() {}
        }

        let combatants: Vec<CombatantReport> = loops
            .iter()
            .map(|(combat, endpoint)| CombatantReport {
                name: combat.combatant().name().to_string(),
                endpoint: endpoint.to_string(),
                phase: combat.phase(),
                health: combat.combatant().health(),
            })
            .collect();
        let winner = combatants
            .iter()
            .find(|c| c.phase == Phase::Terminated(Ending::Won))
            .map(|c| c.name.clone());

        let journal = self.journal.journal();
        let journal_records = journal.records().map(|r| r.len()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read journal back");
            0
        });

        let report = ArenaReport {
            seed: self.config.seed,
            winner,
            combatants,
            attacks_delivered: self.network.delivered(),
            attacks_dropped: self.network.dropped(),
            virtual_time_secs: self.context.now().as_secs_f64(),
            journal_records,
            journal_bytes: journal.size().unwrap_or(0),
        };
        info!(winner = ?report.winner, records = report.journal_records, "Arena finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showdown_core::RetryPolicy;

    fn spec(name: &str, health: u64, damage: u64) -> CombatantSpec {
        CombatantSpec {
            name: name.into(),
            health,
            damage,
        }
    }

    fn fast() -> ArenaConfig {
        ArenaConfig {
            loop_config: LoopConfig::default().with_discovery(RetryPolicy::new(5, Duration::from_millis(10))),
            ..ArenaConfig::default()
        }
    }

    #[tokio::test]
    async fn test_endpoints_are_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let mut arena = Arena::new(fast(), Arc::new(Journal::open(dir.path()).unwrap()));
        assert!(arena.is_empty());
        assert_eq!(arena.enter(&spec("Doc", 10, 4)).to_string(), "10.0.0.1:50002");
        assert_eq!(arena.enter(&spec("Ringo", 6, 6)).to_string(), "10.0.0.2:50003");
        assert_eq!(arena.len(), 2);
    }

    #[tokio::test]
    async fn test_lone_combatant_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut arena = Arena::new(fast(), Arc::new(Journal::open(dir.path()).unwrap()));
        arena.enter(&spec("Sam", 10, 1));

        let report = arena.run().await;

        assert_eq!(report.winner.as_deref(), Some("Sam"));
        assert_eq!(report.journal_records, 2);
        assert_eq!(report.attacks_delivered, 0);
    }

    #[tokio::test]
    async fn test_duel_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let mut arena = Arena::new(fast(), Arc::new(Journal::open(dir.path()).unwrap()));
        arena.enter(&spec("Doc", 10, 4));
        arena.enter(&spec("Ringo", 6, 6));

        let report = arena.run().await;

        assert_eq!(report.with_ending(Ending::Interrupted).count(), 0);
        assert!(report.with_ending(Ending::Won).count() <= 1);
        let winner = report.winner.clone();
        for c in &report.combatants {
            if Some(&c.name) == winner.as_ref() {
                assert!(c.health > 0);
            } else {
                assert_eq!(c.health, 0);
                assert_eq!(c.phase, Phase::Terminated(Ending::Died));
            }
        }
    }
}
