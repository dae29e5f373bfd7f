//! Transport and discovery abstractions for Showdown combatants.

use crate::error::EnvError;
use crate::types::{AttackRequest, AttackResponse, Endpoint, JournalRequest, JournalResponse, PeerRecord};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Service discovery for running combatants.
///
/// # Implementations
///
/// - **Production**: `RosterRegistry` - roster file + TCP liveness probe
/// - **Simulation**: `SimRegistry` - in-memory table with running flags
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Lists peers in the running phase, excluding the one named `exclude`.
    ///
    /// # Returns
    /// * `Ok(peers)` - Zero or more peers (entries may be unresolved)
    /// * `Err(EnvError::NotFound)` - The registry explicitly found nothing
    /// * `Err(_)` - Any other, transient, failure
    async fn running_peers(&self, exclude: &str) -> Result<Vec<PeerRecord>, EnvError>;
}

/// Client side of the attack call.
///
/// ```text
/// Attacker                                 Target
///   |-- attack(endpoint, {damage}) -------->|
///   |                                       |-- receive_attack(damage)
///   |<------------- {message} --------------|
/// ```
#[async_trait]
pub trait AttackTransport: Send + Sync + 'static {
    /// Delivers one attack to `target` and returns its outcome message.
    async fn attack(&self, target: &Endpoint, request: AttackRequest) -> Result<AttackResponse, EnvError>;
}

/// Client side of the journal-append call.
#[async_trait]
pub trait JournalTransport: Send + Sync + 'static {
    /// Appends one event payload and returns the assigned offset.
    async fn append(&self, request: JournalRequest) -> Result<JournalResponse, EnvError>;
}

/// Runs `call` under `deadline`, aborting early if `token` is cancelled.
///
/// Agent-level cancellation takes priority over a call that would
/// complete in the same poll.
pub async fn call_with_deadline<T, F>(
    token: &CancellationToken,
    deadline: Duration,
    call: F,
) -> Result<T, EnvError>
where
    F: Future<Output = Result<T, EnvError>>,
{
    if token.is_cancelled() {
        return Err(EnvError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(EnvError::Cancelled),
        result = tokio::time::timeout(deadline, call) => match result {
            Ok(inner) => inner,
            Err(_) => Err(EnvError::Timeout(deadline.as_millis() as u64)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let token = CancellationToken::new();
        let out = call_with_deadline(&token, Duration::from_secs(1), async { Ok::<_, EnvError>(5) }).await;
        assert_eq!(out.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_deadline_times_out() {
        let token = CancellationToken::new();
        let out = call_with_deadline(&token, Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, EnvError>(())
        })
        .await;
        assert!(matches!(out, Err(EnvError::Timeout(20))));
    }

    #[tokio::test]
    async fn test_deadline_honours_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let out = call_with_deadline(&token, Duration::from_secs(1), async { Ok::<_, EnvError>(()) }).await;
        assert!(matches!(out, Err(EnvError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_cancelled_mid_flight() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let out = call_with_deadline(&token, Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, EnvError>(())
        })
        .await;
        assert!(matches!(out, Err(EnvError::Cancelled)));
    }
}
