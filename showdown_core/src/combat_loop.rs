//! Combat Loop - the decision loop of one combatant.
//!
//! # Tick
//!
//! ```text
//!        ┌──────────────────────────────────────────────────────────┐
//!        ▼                                                          │
//!   health == 0? ──yes──► record death ──► Dead ──► cancel          │
//!        │ no                                                       │
//!   discover (retry) ──failed──► abandon tick                       │
//!        │                                                          │
//!   health == 0? ──yes──► record death ──► Dead ──► cancel          │
//!        │ no                                                       │
//!   NotFound/Empty? ──yes──► record victory ──► Victorious ──► cancel
//!        │ peers                  └──not recorded──► abandon tick   │
//!   pick one at random                                              │
//!        │                                                          │
//!   attack (deadline) ──error──► abandon tick                       │
//!        │ response                                                 │
//!   record "fired at" ──► sleep(pace) ──────────────────────────────┘
//! ```
//!
//! An abandoned tick is picked up again by the periodic scheduler after
//! `restart_period`. The loop ends when the shutdown token fires, whether
//! the combatant cancelled it itself or an operator did.

use crate::combatant::Combatant;
use crate::periodic::run_until_cancelled;
use crate::retry::{retry, RetryError, RetryPolicy};
use crate::state::{Phase, Transition};
use showdown_env::{
    call_with_deadline, ArenaContext, AttackRequest, AttackTransport, CancellationToken, EnvError,
    Endpoint, JournalRequest, JournalTransport, Registry,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Timing knobs of the combat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Retry budget for each discovery
    pub discovery: RetryPolicy,

    /// Deadline for a single registry, attack or journal call
    pub call_deadline: Duration,

    /// Sleep between consecutive attacks inside a tick
    pub pace: Duration,

    /// Wait before re-running an abandoned tick
    pub restart_period: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            discovery: RetryPolicy::default(),
            call_deadline: Duration::from_secs(1),
            pace: Duration::from_secs(1),
            restart_period: Duration::from_secs(1),
        }
    }
}

impl LoopConfig {
    pub fn with_discovery(mut self, policy: RetryPolicy) -> Self {
        self.discovery = policy;
        self
    }

    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_restart_period(mut self, period: Duration) -> Self {
        self.restart_period = period;
        self
    }
}

/// Why a discovery attempt produced no usable targets.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("registry found no opponents")]
    NotFound,

    #[error("registry returned an empty list")]
    Empty,

    #[error("opponent {0} has no address or port yet")]
    Unresolved(String),

    #[error("registry query failed: {0}")]
    Transient(#[source] EnvError),
}

impl DiscoveryError {
    /// True when the failure means nobody is left to fight.
    pub fn means_no_opponents(&self) -> bool {
        matches!(self, DiscoveryError::NotFound | DiscoveryError::Empty)
    }
}

impl From<EnvError> for DiscoveryError {
    fn from(e: EnvError) -> Self {
        if e.is_not_found() {
            DiscoveryError::NotFound
        } else {
            DiscoveryError::Transient(e)
        }
    }
}

/// How one tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The combatant reached `Dead` or `Victorious`
    Finished(Phase),

    /// Discovery or the attack failed; retry on the next period
    Abandoned,

    /// The shutdown token fired mid-tick
    Cancelled,
}

/// The control loop of one combatant.
///
/// Generic over the context and every outside collaborator so the same
/// loop runs in a process (tokio, TCP, roster file) or in the simulator.
pub struct CombatLoop<Ctx, Reg, Net, Jnl>
where
    Ctx: ArenaContext,
    Reg: Registry,
    Net: AttackTransport,
    Jnl: JournalTransport,
{
    combatant: Arc<Combatant>,
    context: Arc<Ctx>,
    registry: Arc<Reg>,
    attacks: Arc<Net>,
    journal: Arc<Jnl>,
    config: LoopConfig,
    shutdown: CancellationToken,
    phase: Mutex<Phase>,
}

impl<Ctx, Reg, Net, Jnl> CombatLoop<Ctx, Reg, Net, Jnl>
where
    Ctx: ArenaContext,
    Reg: Registry,
    Net: AttackTransport,
    Jnl: JournalTransport,
{
    pub fn new(
        combatant: Arc<Combatant>,
        context: Arc<Ctx>,
        registry: Arc<Reg>,
        attacks: Arc<Net>,
        journal: Arc<Jnl>,
        config: LoopConfig,
    ) -> Self {
        Self {
            combatant,
            context,
            registry,
            attacks,
            journal,
            config,
            shutdown: CancellationToken::new(),
            phase: Mutex::new(Phase::Alive),
        }
    }

    /// Uses `token` as this combatant's shutdown token.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn combatant(&self) -> &Arc<Combatant> {
        &self.combatant
    }

    /// Token cancelled when the combatant terminates.
    pub fn token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs ticks until the shutdown token fires and returns the final phase.
    pub async fn run(&self) -> Phase {
        let c = &self.combatant;
        self.record(format!(
            "{} with {} health and {} damage was initialized",
            c.name(),
            c.health(),
            c.damage()
        ))
        .await;

        let this = self;
        let ticks = run_until_cancelled(&*self.context, self.config.restart_period, &self.shutdown, move || async move {
            let outcome = this.tick().await;
            debug!(name = %this.combatant.name(), ?outcome, "Tick ended");
        })
        .await;

        let phase = self.apply(Transition::Cancelled);
        info!(name = %self.combatant.name(), ticks, %phase, "Combat loop stopped");
        phase
    }

    /// One tick: attack opponents until death, victory, or a failure.
    pub async fn tick(&self) -> TickOutcome {
        let name = self.combatant.name();

        loop {
            if self.shutdown.is_cancelled() {
                return TickOutcome::Cancelled;
            }

            if self.combatant.is_dead() {
                return self.die().await;
            }

            let discovered = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return TickOutcome::Cancelled,
                result = self.discover() => result,
            };
            // Discovery can take a while; a shot may have landed meanwhile.
            if self.combatant.is_dead() {
                return self.die().await;
            }
            let targets = match discovered {
                Ok(targets) => targets,
                Err(e) if e.last.means_no_opponents() => {
                    info!(name = %name, reason = %e, "No opponents left");
                    let recorded = self.record(format!("no opponents left, {name} is the winner")).await;
                    if recorded.is_none() {
                        warn!(name = %name, "Victory not recorded, checking again next period");
                        return TickOutcome::Abandoned;
                    }
                    return self.finish(Transition::NoOpponents);
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "Discovery failed, abandoning tick");
                    return TickOutcome::Abandoned;
                }
            };

            let target = &targets[self.context.pick_index(targets.len())];
            let request = AttackRequest {
                damage: self.combatant.damage(),
            };
            let attacked = call_with_deadline(
                &self.shutdown,
                self.config.call_deadline,
                self.attacks.attack(target, request),
            )
            .await;
            let response = match attacked {
                Ok(response) => response,
                Err(EnvError::Cancelled) => return TickOutcome::Cancelled,
                Err(e) => {
                    warn!(name = %name, target = %target, error = %e, "Attack failed, abandoning tick");
                    return TickOutcome::Abandoned;
                }
            };

            self.record(format!("{name} fired at {target} and {}", response.message))
                .await;

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return TickOutcome::Cancelled,
                _ = self.context.sleep(self.config.pace) => {}
            }
        }
    }

    async fn die(&self) -> TickOutcome {
        let name = self.combatant.name();
        self.record(format!("{name} realizes they are dead")).await;
        self.finish(Transition::HealthDepleted)
    }

    /// Fetches a fresh, fully resolved list of opponent endpoints.
    async fn discover(&self) -> Result<Vec<Endpoint>, RetryError<DiscoveryError>> {
        retry(&*self.context, self.config.discovery, || self.snapshot()).await
    }

    async fn snapshot(&self) -> Result<Vec<Endpoint>, DiscoveryError> {
        let peers = call_with_deadline(
            &self.shutdown,
            self.config.call_deadline,
            self.registry.running_peers(self.combatant.name()),
        )
        .await?;

        if peers.is_empty() {
            return Err(DiscoveryError::Empty);
        }
        peers
            .iter()
            .map(|peer| {
                peer.endpoint()
                    .ok_or_else(|| DiscoveryError::Unresolved(peer.name.clone()))
            })
            .collect()
    }

    /// Logs `message` locally and appends it to the journal.
    ///
    /// Journal failures are logged and yield `None`.
    async fn record(&self, message: String) -> Option<u64> {
        info!(name = %self.combatant.name(), "{message}");
        let appended = call_with_deadline(
            &self.shutdown,
            self.config.call_deadline,
            self.journal.append(JournalRequest::message(message)),
        )
        .await;
        match appended {
            Ok(response) => {
                debug!(offset = response.offset, "Event recorded");
                Some(response.offset)
            }
            Err(e) => {
                warn!(name = %self.combatant.name(), error = %e, "Failed to record event");
                None
            }
        }
    }

    fn apply(&self, transition: Transition) -> Phase {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *phase;
        let next = current.next(transition);
        if next != current {
            info!(name = %self.combatant.name(), from = %current, to = %next, "Phase changed");
            *phase = next;
        }
        next
    }

    fn finish(&self, transition: Transition) -> TickOutcome {
        let phase = self.apply(transition);
        self.shutdown.cancel();
        TickOutcome::Finished(phase)
    }
}
