//! Job lifecycle operations on the JobManager
//!
//! Thin wrappers over the job endpoints that log failures and return
//! `bool`/`Option` like the health probe does.

use super::client::ClusterApi;
use super::models::{JobDetail, JobState, TaskManagerInfo};
use crate::flinkpilot::clock::Clock;
use crate::flinkpilot::config::PilotConfig;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Details of one job, with epoch-millis converted to timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub job_id: String,
    pub name: String,
    pub state: JobState,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub parallelism: u32,
}

impl JobInfo {
    pub fn from_detail(job_id: &str, detail: JobDetail) -> Self {
        Self {
            job_id: job_id.to_string(),
            name: detail.name,
            state: detail.state,
            start_time: detail.start_time.and_then(millis_to_utc),
            // Flink reports -1 while the job is still running
            end_time: detail
                .end_time
                .filter(|&ms| ms > 0)
                .and_then(millis_to_utc),
            duration_ms: detail.duration,
            parallelism: detail.parallelism.unwrap_or(1),
        }
    }
}

pub(crate) fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Cancel, inspect and list jobs
pub struct JobControl {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    restart_grace: Duration,
}

impl JobControl {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, config: &PilotConfig) -> Self {
        Self {
            api,
            clock,
            restart_grace: config.restart_grace,
        }
    }

    pub async fn job_details(&self, job_id: &str) -> Option<JobInfo> {
        match self.api.job_detail(job_id).await {
            Ok(detail) => Some(JobInfo::from_detail(job_id, detail)),
            Err(e) => {
                error!("Error getting job details for {}: {}", job_id, e);
                None
            }
        }
    }

    /// Request cancellation; `true` only when the JobManager accepted it
    pub async fn cancel_job(&self, job_id: &str) -> bool {
        match self.api.cancel_job(job_id).await {
            Ok(()) => {
                info!("Job {} cancellation requested", job_id);
                true
            }
            Err(e) => {
                error!("Failed to cancel job {}: {}", job_id, e);
                false
            }
        }
    }

    /// Cancel the job and confirm it is still known to the JobManager
    ///
    /// The job definition is not kept anywhere, so nothing is resubmitted:
    /// after a successful "restart" the job stays cancelled.
    pub async fn restart_job(&self, job_id: &str) -> bool {
        if !self.cancel_job(job_id).await {
            return false;
        }

        self.clock.sleep(self.restart_grace).await;

        match self.job_details(job_id).await {
            Some(info) => {
                warn!(
                    "Job {} ({}) cancelled with state {}; resubmission requires the original statement",
                    job_id, info.name, info.state
                );
                true
            }
            None => false,
        }
    }

    pub async fn job_metrics(&self, job_id: &str) -> Option<serde_json::Value> {
        match self.api.job_metrics(job_id).await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                error!("Error getting job metrics for {}: {}", job_id, e);
                None
            }
        }
    }

    /// All registered TaskManagers; empty when the call fails
    pub async fn taskmanagers(&self) -> Vec<TaskManagerInfo> {
        match self.api.taskmanagers().await {
            Ok(list) => list,
            Err(e) => {
                error!("Error getting TaskManager info: {}", e);
                Vec::new()
            }
        }
    }
}
