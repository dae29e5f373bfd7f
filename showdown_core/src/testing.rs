//! Test doubles shared by the unit tests in this crate.

use async_trait::async_trait;
use showdown_env::ArenaContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Context whose sleeps complete immediately and are recorded.
#[derive(Default)]
pub struct VirtualClock {
    slept: Mutex<Vec<Duration>>,
    picks: AtomicUsize,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    /// Sum of all requested sleeps.
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl ArenaContext for VirtualClock {
    fn now(&self) -> Duration {
        self.total_slept()
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }

    fn pick_index(&self, len: usize) -> usize {
        self.picks.fetch_add(1, Ordering::Relaxed) % len
    }

    fn seed(&self) -> u64 {
        0
    }
}
