//! Supervised periodic execution.
//!
//! Runs a task, waits one period, runs it again, until the cancellation
//! token fires. A panic inside one invocation is caught, logged, and the
//! schedule carries on: one bad tick cannot take the combatant down.
//! The task is never run concurrently with itself.

use futures::FutureExt;
use showdown_env::{ArenaContext, CancellationToken};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, error};

/// Runs `task` every `period` until `token` is cancelled.
///
/// The token is checked once before the first run, so an already-cancelled
/// token means zero runs. After each run the period timer races the token
/// and cancellation wins ties. Returns the number of invocations.
pub async fn run_until_cancelled<C, F, Fut>(
    ctx: &C,
    period: Duration,
    token: &CancellationToken,
    mut task: F,
) -> u64
where
    C: ArenaContext,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    if token.is_cancelled() {
        debug!("Cancelled before first run");
        return 0;
    }

    let mut runs: u64 = 0;
    loop {
        runs += 1;
        let invocation = AssertUnwindSafe(async { task().await });
        if let Err(payload) = invocation.catch_unwind().await {
            error!(run = runs, panic = %panic_message(payload.as_ref()), "Recovered from panic in periodic task");
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(runs, "Periodic task cancelled");
                return runs;
            }
            _ = ctx.sleep(period) => {}
        }
    }
}

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::VirtualClock;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_pre_cancelled_runs_zero_times() {
        let ctx = VirtualClock::new();
        let token = CancellationToken::new();
        token.cancel();
        let calls = Cell::new(0u32);

        let runs = run_until_cancelled(&ctx, Duration::from_secs(1), &token, || {
            calls.set(calls.get() + 1);
            async {}
        })
        .await;

        assert_eq!(runs, 0);
        assert_eq!(calls.get(), 0);
        assert!(ctx.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_stops_when_task_cancels() {
        let ctx = VirtualClock::new();
        let token = CancellationToken::new();
        let calls = Cell::new(0u32);

        let runs = run_until_cancelled(&ctx, Duration::from_secs(1), &token, || {
            calls.set(calls.get() + 1);
            if calls.get() == 3 {
                token.cancel();
            }
            async {}
        })
        .await;

        assert_eq!(runs, 3);
        // Period sleeps between runs only; cancellation wins after the third.
        assert_eq!(ctx.sleeps(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn test_panics_do_not_stop_the_schedule() {
        let ctx = VirtualClock::new();
        let token = CancellationToken::new();
        let calls = Cell::new(0u32);

        let runs = run_until_cancelled(&ctx, Duration::from_millis(10), &token, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            let token = token.clone();
            async move {
                if n == 4 {
                    token.cancel();
                    return;
                }
                if n % 2 == 1 {
                    panic!("tick {n} exploded");
                }
            }
        })
        .await;

        assert_eq!(runs, 4);
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_panic_while_building_the_future_is_caught() {
        let ctx = VirtualClock::new();
        let token = CancellationToken::new();
        let calls = Cell::new(0u32);

        let runs = run_until_cancelled(&ctx, Duration::from_millis(10), &token, || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                panic!("bad setup");
            }
            token.cancel();
            async {}
        })
        .await;

        assert_eq!(runs, 2);
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
