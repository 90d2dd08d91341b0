//! Continuous tracking of submitted streaming jobs
//!
//! Each cycle lists the jobs known to the JobManager, remembers every
//! non-terminal job by name, then asks for the individual status of every
//! remembered job. The JobManager keeps finished jobs in its listing; those
//! entries are never tracked and count as an empty listing.
//! FINISHED jobs are dropped quietly, FAILED and CANCELED jobs are dropped
//! with an error. Nothing is resubmitted.
//!
//! The loop ends on an interrupt or after `max_idle_checks` consecutive
//! empty listings. Idle-stop only means nothing is left to watch; it says
//! nothing about how the tracked jobs ended. A failed listing is retried
//! after the shorter error backoff and does not count as an empty listing.

use crate::flinkpilot::cluster::client::ClusterApi;
use crate::flinkpilot::cluster::jobs::millis_to_utc;
use crate::flinkpilot::cluster::models::{JobState, JobSummary};
use crate::flinkpilot::clock::Clock;
use crate::flinkpilot::config::PilotConfig;
use crate::flinkpilot::shutdown::ShutdownListener;
use chrono::Local;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A job the monitor has seen in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub job_id: String,
    pub last_state: JobState,
}

/// Result of one monitor cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The listing returned `running` non-terminal jobs
    Active { running: usize },
    /// No non-terminal job listed; `consecutive` such listings so far
    Idle { consecutive: u32 },
    /// The listing call failed
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStopReason {
    /// Idle-stop threshold reached
    Idle,
    Interrupted,
}

/// Summary of a finished monitor run
#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub cycles: u64,
    pub stop_reason: MonitorStopReason,
    /// Names of jobs observed FINISHED
    pub completed: Vec<String>,
    /// Jobs observed FAILED or CANCELED
    pub failed: Vec<(String, JobState)>,
    /// Records still tracked when the loop ended
    pub still_tracked: Vec<JobRecord>,
}

pub struct JobMonitor {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    error_backoff: Duration,
    max_idle_checks: u32,
    tracked: BTreeMap<String, JobRecord>,
    idle_checks: u32,
    completed: Vec<String>,
    failed: Vec<(String, JobState)>,
}

impl JobMonitor {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, config: &PilotConfig) -> Self {
        Self {
            api,
            clock,
            interval: config.monitor_interval,
            error_backoff: config.monitor_error_backoff,
            max_idle_checks: config.monitor_max_idle_checks,
            tracked: BTreeMap::new(),
            idle_checks: 0,
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Tracked records, ordered by job name
    pub fn tracked(&self) -> Vec<&JobRecord> {
        self.tracked.values().collect()
    }

    pub fn is_tracking(&self, name: &str) -> bool {
        self.tracked.contains_key(name)
    }

    pub fn idle_checks(&self) -> u32 {
        self.idle_checks
    }

    pub fn idle_limit_reached(&self) -> bool {
        self.idle_checks >= self.max_idle_checks
    }

    /// One listing plus one status check per tracked job
    ///
    /// Listing entries that are already terminal are never tracked and do
    /// not count as running; a tracked job listed as terminal is retired on
    /// the spot.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let jobs = match self.api.list_jobs().await {
            Ok(overview) => overview.jobs,
            Err(e) => {
                error!("Error in job monitoring: {}", e);
                return CycleOutcome::Error(e.to_string());
            }
        };

        let (finished, active): (Vec<_>, Vec<_>) =
            jobs.iter().partition(|job| job.state.is_terminal());

        for job in finished {
            let tracked_here = self
                .tracked
                .get(&job.name)
                .is_some_and(|record| record.job_id == job.id);
            if tracked_here {
                self.retire(job.name.clone(), job.state);
            }
        }

        let running = active.len();
        if running > 0 {
            info!("Found {} running jobs:", running);
        }
        for job in active {
            info!("{}", describe_job(job));
            self.tracked.insert(
                job.name.clone(),
                JobRecord {
                    name: job.name.clone(),
                    job_id: job.id.clone(),
                    last_state: job.state,
                },
            );
        }

        let outcome = if running == 0 {
            self.idle_checks += 1;
            info!(
                "No running jobs found (check {}/{})",
                self.idle_checks, self.max_idle_checks
            );
            CycleOutcome::Idle {
                consecutive: self.idle_checks,
            }
        } else {
            self.idle_checks = 0;
            CycleOutcome::Active { running }
        };

        self.check_tracked_jobs().await;
        outcome
    }

    /// Drop a record that reached FINISHED, FAILED or CANCELED
    fn retire(&mut self, name: String, state: JobState) {
        self.tracked.remove(&name);
        if state == JobState::Finished {
            info!("Job {} completed successfully", name);
            self.completed.push(name);
        } else {
            error!("Job {} failed with state: {}", name, state);
            self.failed.push((name, state));
        }
    }

    async fn check_tracked_jobs(&mut self) {
        let snapshot: Vec<(String, String)> = self
            .tracked
            .values()
            .map(|r| (r.name.clone(), r.job_id.clone()))
            .collect();

        for (name, job_id) in snapshot {
            let state = match self.api.job_detail(&job_id).await {
                Ok(detail) => detail.state,
                Err(e) => {
                    warn!("Failed to get status of job {} ({}): {}", name, job_id, e);
                    continue;
                }
            };

            match state {
                JobState::Finished | JobState::Failed | JobState::Canceled => {
                    self.retire(name, state);
                }
                JobState::Initializing
                | JobState::Created
                | JobState::Running
                | JobState::Failing
                | JobState::Cancelling
                | JobState::Restarting
                | JobState::Suspended
                | JobState::Reconciling
                | JobState::Unknown => {
                    if let Some(record) = self.tracked.get_mut(&name) {
                        record.last_state = state;
                    }
                }
            }
        }
    }

    /// Run cycles until idle-stop or shutdown
    pub async fn run(&mut self, shutdown: &mut ShutdownListener) -> MonitorReport {
        info!("Starting job monitoring...");
        let mut cycles = 0;

        let stop_reason = loop {
            if shutdown.is_triggered() {
                break MonitorStopReason::Interrupted;
            }

            let delay = match self.run_cycle().await {
                CycleOutcome::Error(_) => self.error_backoff,
                CycleOutcome::Active { .. } | CycleOutcome::Idle { .. } => self.interval,
            };
            cycles += 1;

            if self.idle_limit_reached() {
                info!("No jobs found after extended monitoring - stopping monitor");
                break MonitorStopReason::Idle;
            }

            tokio::select! {
                _ = self.clock.sleep(delay) => {}
                _ = shutdown.wait() => break MonitorStopReason::Interrupted,
            }
        };

        if stop_reason == MonitorStopReason::Interrupted {
            info!("Job monitoring stopped by user");
        }

        MonitorReport {
            cycles,
            stop_reason,
            completed: self.completed.clone(),
            failed: self.failed.clone(),
            still_tracked: self.tracked.values().cloned().collect(),
        }
    }
}

/// `  • name (1a2b3c4d...): RUNNING (started: 14:03:07)`
fn describe_job(job: &JobSummary) -> String {
    let short_id: String = job.id.chars().take(8).collect();
    let started = job
        .start_time
        .filter(|&ms| ms > 0)
        .and_then(millis_to_utc)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "  • {} ({}...): {} (started: {})",
        job.name, short_id, job.state, started
    )
}
