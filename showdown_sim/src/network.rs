//! Simulated attack network with fault injection.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use showdown_core::AttackService;
use showdown_env::{AttackRequest, AttackResponse, AttackTransport, Endpoint, EnvError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

/// In-memory attack delivery between combatants of one arena.
///
/// Every listening combatant is an `AttackService` bound to an endpoint.
/// An attack to an endpoint nobody listens on is `Unreachable`; with a
/// non-zero loss rate a delivery may instead be dropped as a network error.
pub struct SimNetwork {
    /// Listening services by endpoint
    services: RwLock<HashMap<Endpoint, AttackService>>,

    /// Probability of dropping a delivery (0.0 - 1.0)
    loss_rate: f64,

    /// RNG deciding drops
    rng: Mutex<ChaCha8Rng>,

    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl SimNetwork {
    /// Creates a lossless network.
    pub fn new(seed: u64) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            loss_rate: 0.0,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Sets the drop probability.
    pub fn with_loss_rate(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate.clamp(0.0, 1.0);
        self
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    /// Starts serving `service` at `endpoint`.
    pub fn listen(&self, endpoint: Endpoint, service: AttackService) {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint, service);
    }

    /// Stops serving at `endpoint`; later attacks there are unreachable.
    pub fn shutdown(&self, endpoint: &Endpoint) {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(endpoint);
    }

    /// Attacks that reached their target.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Attacks lost to injected faults.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn should_drop(&self) -> bool {
        self.loss_rate > 0.0
            && self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .gen_bool(self.loss_rate)
    }
}

#[async_trait]
impl AttackTransport for SimNetwork {
    async fn attack(&self, target: &Endpoint, request: AttackRequest) -> Result<AttackResponse, EnvError> {
        if self.should_drop() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(target = %target, "Dropped attack");
            return Err(EnvError::network(format!("attack to {target} dropped")));
        }

        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        let service = services.get(target).ok_or_else(|| EnvError::unreachable(target))?;
        let response = service.apply(request);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(response)
    }
}
