//! Bounded retry with exponential backoff.
//!
//! Attempt 1 runs immediately. Before each later attempt the caller sleeps
//! for the current backoff, which then doubles:
//!
//! ```text
//! attempt:   1     2     3     4     5
//! sleep:     -     b     2b    4b    8b      total = b * (2^(N-1) - 1)
//! ```
//!
//! There is no jitter and no ceiling. Large attempt counts therefore sleep
//! for a very long time; keep `max_attempts` small.

use showdown_env::ArenaContext;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// How many times to try and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1
    pub max_attempts: u32,

    /// Sleep before the second attempt
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Total time slept if every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        let doublings = self.max_attempts.max(1) - 1;
        let factor = 2u32.saturating_pow(doublings).saturating_sub(1);
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

/// Every attempt failed.
#[derive(Debug, Error)]
#[error("after {attempts} attempts, last error: {last}")]
pub struct RetryError<E> {
    /// Attempts made
    pub attempts: u32,

    /// Failure of the final attempt
    pub last: E,
}

impl<E> RetryError<E> {
    pub fn into_last(self) -> E {
        self.last
    }
}

/// Runs `operation` until it succeeds or `policy.max_attempts` is reached.
pub async fn retry<C, F, Fut, T, E>(ctx: &C, policy: RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    C: ArenaContext,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(last) if attempt >= attempts => return Err(RetryError { attempts, last }),
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Retrying after error"
                );
                ctx.sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}
