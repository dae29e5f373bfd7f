//! A combatant's identity and health, and the inbound attack service.
//!
//! Health is the only mutable field. It sits behind a reader/writer lock:
//! the control loop and status queries read it concurrently, inbound
//! attacks take the write side one at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use showdown_env::{AttackRequest, AttackResponse, EnvError, RequestHandler};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Configuration a combatant is created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSpec {
    /// Display name, unique among combatants
    pub name: String,

    /// Initial health
    pub health: u64,

    /// Damage inflicted per attack
    pub damage: u64,
}

/// Result of applying one inbound attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Damage applied; `remaining` is the health afterwards
    Hit { damage: u64, remaining: u64 },
    /// Health was already zero; nothing changed
    AlreadyDead,
}

/// One named participant.
#[derive(Debug)]
pub struct Combatant {
    name: String,
    damage: u64,
    health: RwLock<u64>,
}

impl Combatant {
    /// Creates a combatant.
    pub fn new(name: impl Into<String>, health: u64, damage: u64) -> Self {
        Self {
            name: name.into(),
            damage,
            health: RwLock::new(health),
        }
    }

    /// Creates a combatant from its spec.
    pub fn from_spec(spec: &CombatantSpec) -> Self {
        Self::new(spec.name.clone(), spec.health, spec.damage)
    }

    /// Creates an Arc-wrapped combatant for sharing between server and loop.
    pub fn shared(name: impl Into<String>, health: u64, damage: u64) -> Arc<Self> {
        Arc::new(Self::new(name, health, damage))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn damage(&self) -> u64 {
        self.damage
    }

    /// Current health (shared read).
    pub fn health(&self) -> u64 {
        *self.health.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_dead(&self) -> bool {
        self.health() == 0
    }

    /// Applies `damage`, clamping health at zero.
    ///
    /// The dead check and the subtraction happen under one write lock, so
    /// two concurrent attackers cannot both observe the same pre-attack
    /// health.
    pub fn receive_attack(&self, damage: u64) -> AttackOutcome {
        let mut health = self.health.write().unwrap_or_else(PoisonError::into_inner);
        if *health == 0 {
            return AttackOutcome::AlreadyDead;
        }
        *health = health.saturating_sub(damage);
        AttackOutcome::Hit {
            damage,
            remaining: *health,
        }
    }

    /// Human-readable response for `outcome`.
    pub fn describe(&self, outcome: AttackOutcome) -> String {
        match outcome {
            AttackOutcome::Hit { damage, .. } => format!("{} was shot with {} damage", self.name, damage),
            AttackOutcome::AlreadyDead => format!("{} is dead already", self.name),
        }
    }
}

/// Server side of the attack call.
#[derive(Debug, Clone)]
pub struct AttackService {
    combatant: Arc<Combatant>,
}

impl AttackService {
    pub fn new(combatant: Arc<Combatant>) -> Self {
        Self { combatant }
    }

    /// Applies an attack and builds the response.
    pub fn apply(&self, request: AttackRequest) -> AttackResponse {
        let outcome = self.combatant.receive_attack(request.damage);
        if let AttackOutcome::Hit { damage, remaining } = outcome {
            info!(name = %self.combatant.name(), damage, remaining, "Took a hit");
        }
        AttackResponse {
            message: self.combatant.describe(outcome),
        }
    }
}

#[async_trait]
impl RequestHandler for AttackService {
    type Request = AttackRequest;
    type Response = AttackResponse;

    async fn handle(&self, request: AttackRequest) -> Result<AttackResponse, EnvError> {
        Ok(self.apply(request))
    }
}
