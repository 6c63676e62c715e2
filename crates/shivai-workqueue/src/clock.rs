//! Clocks for retry eligibility.
//!
//! Readings are offsets from the clock's own epoch. Handler timeouts always
//! use tokio time; only queue eligibility goes through a [`Clock`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[async_trait]
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Duration;

    /// Resolve once `now() >= deadline`.
    async fn sleep_until(&self, deadline: Duration);
}

/// Monotonic clock backed by tokio time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    async fn sleep_until(&self, deadline: Duration) {
        match self.epoch.checked_add(deadline) {
            Some(at) => tokio::time::sleep_until(at).await,
            // Past the end of representable time.
            None => std::future::pending().await,
        }
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: watch::Sender<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (now, _) = watch::channel(Duration::ZERO);
        Self { now }
    }

    pub fn advance(&self, by: Duration) {
        self.now.send_modify(|now| *now += by);
    }

    pub fn set(&self, to: Duration) {
        self.now.send_replace(to);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.borrow()
    }

    async fn sleep_until(&self, deadline: Duration) {
        let mut rx = self.now.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|now| *now >= deadline).await;
    }
}
