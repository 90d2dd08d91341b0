//! Shared helpers for the mock-cluster tests

use flinkpilot::flinkpilot::cluster::{ClusterOverview, JobState, JobSummary};
use async_trait::async_trait;
use flinkpilot::{
    Clock, ClusterApi, MockClusterApi, PilotConfig, ShutdownCoordinator, ShutdownSignal,
    SimulatedClock,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default timings against a host nobody resolves
pub fn test_config() -> PilotConfig {
    PilotConfig::new("jobmanager.test", 8081)
}

pub fn overview(taskmanagers: i64, slots_available: i64) -> ClusterOverview {
    ClusterOverview {
        taskmanagers,
        slots_total: slots_available.max(0),
        slots_available,
        ..Default::default()
    }
}

pub fn job(id: &str, name: &str, state: JobState) -> JobSummary {
    JobSummary {
        id: id.to_string(),
        name: name.to_string(),
        state,
        start_time: Some(1_700_000_000_000),
    }
}

/// The mock twice: once to script and inspect, once as the trait object
pub fn shared(mock: MockClusterApi) -> (Arc<MockClusterApi>, Arc<dyn ClusterApi>) {
    let mock = Arc::new(mock);
    let api: Arc<dyn ClusterApi> = mock.clone();
    (mock, api)
}

pub fn clock() -> Arc<SimulatedClock> {
    Arc::new(SimulatedClock::new())
}

/// Simulated clock that raises an interrupt after a number of sleeps
pub struct InterruptingClock {
    inner: SimulatedClock,
    coordinator: ShutdownCoordinator,
    after_sleeps: usize,
}

impl InterruptingClock {
    pub fn new(coordinator: ShutdownCoordinator, after_sleeps: usize) -> Self {
        Self {
            inner: SimulatedClock::new(),
            coordinator,
            after_sleeps,
        }
    }

    pub fn sleep_count(&self) -> usize {
        self.inner.sleep_count()
    }
}

#[async_trait]
impl Clock for InterruptingClock {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.inner.sleep(duration).await;
        if self.inner.sleep_count() == self.after_sleeps {
            self.coordinator.trigger(ShutdownSignal::Interrupt);
        }
    }
}
