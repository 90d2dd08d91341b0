//! Time source for every polling loop
//!
//! All waiting in flinkpilot goes through [`Clock`] so that the readiness
//! wait, operation polling and the job monitor can be driven by
//! [`SimulatedClock`] in tests without real delays.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block the current task for `duration`
    async fn sleep(&self, duration: Duration);

    /// Time elapsed since `start`
    fn elapsed_since(&self, start: Instant) -> Duration {
        self.now().saturating_duration_since(start)
    }
}

/// Wall clock backed by `tokio::time`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: `sleep` returns immediately and advances `now`
///
/// Every requested sleep is recorded so tests can assert on pacing.
#[derive(Debug)]
pub struct SimulatedClock {
    origin: Instant,
    state: Mutex<SimulatedState>,
}

#[derive(Debug, Default)]
struct SimulatedState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(SimulatedState::default()),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
    }

    /// Total virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.lock().sleeps.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().offset
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}
