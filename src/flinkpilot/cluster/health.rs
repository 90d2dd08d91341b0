//! Cluster readiness probing
//!
//! Two different questions are answered here:
//!
//! - *is the JobManager reachable?* ([`ClusterHealthProbe::wait_for_jobmanager`]),
//!   a fixed number of attempts against `/overview` that only looks at the
//!   HTTP status
//! - *can the cluster run a job?* ([`ClusterHealthProbe::is_healthy`]), which
//!   needs at least one TaskManager and at least one free slot
//!
//! None of the probe methods return errors. A transport failure or a
//! non-success status simply reads as "not ready".

use super::client::ClusterApi;
use super::models::ClusterOverview;
use crate::flinkpilot::clock::Clock;
use crate::flinkpilot::config::PilotConfig;
use crate::flinkpilot::shutdown::ShutdownListener;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time view of cluster resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterSnapshot {
    pub taskmanagers: i64,
    pub slots_total: i64,
    pub slots_available: i64,
    pub jobs_running: i64,
    pub jobs_finished: i64,
    pub jobs_cancelled: i64,
    pub jobs_failed: i64,
}

impl ClusterSnapshot {
    /// At least one TaskManager and at least one free slot
    pub fn is_healthy(&self) -> bool {
        self.taskmanagers > 0 && self.slots_available > 0
    }

    /// No free slot while jobs are running
    pub fn is_saturated(&self) -> bool {
        self.slots_available == 0 && self.jobs_running > 0
    }
}

impl From<ClusterOverview> for ClusterSnapshot {
    fn from(o: ClusterOverview) -> Self {
        Self {
            taskmanagers: o.taskmanagers,
            slots_total: o.slots_total,
            slots_available: o.slots_available,
            jobs_running: o.jobs_running,
            jobs_finished: o.jobs_finished,
            jobs_cancelled: o.jobs_cancelled,
            jobs_failed: o.jobs_failed,
        }
    }
}

/// Answers "is the cluster usable" and can wait until it is
pub struct ClusterHealthProbe {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    readiness_attempts: u32,
    readiness_interval: Duration,
    error_backoff: Duration,
}

impl ClusterHealthProbe {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, config: &PilotConfig) -> Self {
        Self {
            api,
            clock,
            poll_interval: config.health_poll_interval,
            readiness_attempts: config.readiness_attempts,
            readiness_interval: config.readiness_interval,
            error_backoff: config.monitor_error_backoff,
        }
    }

    /// One bounded read of `/overview`; `false` on any error
    pub async fn is_healthy(&self) -> bool {
        match self.api.overview().await {
            Ok(overview) => ClusterSnapshot::from(overview).is_healthy(),
            Err(e) => {
                error!("Error checking cluster health: {}", e);
                false
            }
        }
    }

    /// Full snapshot, or `None` when the overview cannot be read
    pub async fn snapshot(&self) -> Option<ClusterSnapshot> {
        match self.api.overview().await {
            Ok(overview) => Some(overview.into()),
            Err(e) => {
                error!("Error getting cluster info: {}", e);
                None
            }
        }
    }

    /// Poll every `poll_interval` until healthy or `max_wait` elapsed
    pub async fn wait_until_ready(&self, max_wait: Duration) -> bool {
        let start = self.clock.now();

        while self.clock.elapsed_since(start) < max_wait {
            if let Some(snapshot) = self.snapshot().await {
                if snapshot.is_healthy() {
                    info!(
                        "Cluster ready - TaskManagers: {}, Available slots: {}",
                        snapshot.taskmanagers, snapshot.slots_available
                    );
                    return true;
                }
            }

            info!("Waiting for cluster to be ready...");
            self.clock.sleep(self.poll_interval).await;
        }

        error!("Cluster failed to become ready within {:?}", max_wait);
        false
    }

    /// Reachability wait: `/overview` answers 2xx within the attempt budget
    ///
    /// Slot availability is not checked here.
    pub async fn wait_for_jobmanager(&self) -> bool {
        for attempt in 1..=self.readiness_attempts {
            match self.api.overview().await {
                Ok(_) => {
                    info!("JobManager is ready");
                    return true;
                }
                Err(e) => debug!("JobManager not ready (attempt {}): {}", attempt, e),
            }

            self.clock.sleep(self.readiness_interval).await;
        }

        error!("JobManager failed to become ready");
        false
    }

    /// Log cluster status every `interval` until shutdown
    ///
    /// Returns the number of completed status cycles.
    pub async fn watch(&self, interval: Duration, shutdown: &mut ShutdownListener) -> u64 {
        info!("Starting cluster health monitoring...");
        let mut cycles = 0;

        while !shutdown.is_triggered() {
            let delay = match self.api.overview().await {
                Ok(overview) => {
                    let snapshot = ClusterSnapshot::from(overview);
                    info!(
                        "Cluster Status - TaskManagers: {}, Jobs Running: {}, Available Slots: {}",
                        snapshot.taskmanagers, snapshot.jobs_running, snapshot.slots_available
                    );
                    if snapshot.jobs_failed > 0 {
                        warn!("Found {} failed jobs", snapshot.jobs_failed);
                    }
                    if snapshot.is_saturated() {
                        warn!("No available slots - cluster may be overloaded");
                    }
                    cycles += 1;
                    interval
                }
                Err(e) => {
                    error!("Failed to get cluster information: {}", e);
                    self.error_backoff
                }
            };

            tokio::select! {
                _ = self.clock.sleep(delay) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Cluster monitoring stopped");
        cycles
    }
}
