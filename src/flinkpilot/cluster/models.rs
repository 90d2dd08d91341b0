//! Wire models for the JobManager REST API and the SQL gateway
//!
//! Field names follow the JSON exactly (`slots-available`, `start-time`,
//! `sessionHandle`, ...). Missing numeric fields deserialize to zero so a
//! partial overview never fails a health probe on decoding alone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// `GET /overview`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterOverview {
    #[serde(default)]
    pub taskmanagers: i64,
    #[serde(default)]
    pub slots_total: i64,
    #[serde(default)]
    pub slots_available: i64,
    #[serde(default)]
    pub jobs_running: i64,
    #[serde(default)]
    pub jobs_finished: i64,
    #[serde(default)]
    pub jobs_cancelled: i64,
    #[serde(default)]
    pub jobs_failed: i64,
}

/// Job lifecycle state as reported by the JobManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Initializing,
    Created,
    Running,
    Failing,
    Failed,
    Cancelling,
    Canceled,
    Finished,
    Restarting,
    Suspended,
    Reconciling,
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// FINISHED, FAILED and CANCELED never transition further
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Failing => "FAILING",
            Self::Failed => "FAILED",
            Self::Cancelling => "CANCELLING",
            Self::Canceled => "CANCELED",
            Self::Finished => "FINISHED",
            Self::Restarting => "RESTARTING",
            Self::Suspended => "SUSPENDED",
            Self::Reconciling => "RECONCILING",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unknown() -> String {
    "unknown".to_string()
}

fn unknown_state() -> JobState {
    JobState::Unknown
}

/// One entry of `GET /jobs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(default = "unknown")]
    pub id: String,
    #[serde(default = "unknown")]
    pub name: String,
    /// Older JobManagers report `status` instead of `state`
    #[serde(default = "unknown_state", alias = "status")]
    pub state: JobState,
    /// Epoch milliseconds
    #[serde(rename = "start-time", default)]
    pub start_time: Option<i64>,
}

/// `GET /jobs`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsOverview {
    #[serde(default)]
    pub jobs: Vec<JobSummary>,
}

/// `GET /jobs/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default = "unknown_state")]
    pub state: JobState,
    #[serde(rename = "start-time", default)]
    pub start_time: Option<i64>,
    /// `-1` while the job is still running
    #[serde(rename = "end-time", default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

/// One entry of `GET /taskmanagers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskManagerInfo {
    pub id: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub slots_number: i64,
    #[serde(default)]
    pub free_slots: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TaskManagerList {
    #[serde(default)]
    pub taskmanagers: Vec<TaskManagerInfo>,
}

/// Opaque SQL gateway session token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(pub String);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token for one asynchronous statement execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(pub String);

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `POST /v1/sessions` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_name: String,
    pub planner: String,
    pub execution_type: String,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionResponse {
    pub session_handle: SessionHandle,
}

/// `POST /v1/sessions/{h}/statements` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    pub statement: String,
    pub execution_config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatementResponse {
    pub operation_handle: OperationHandle,
}

/// Status of a gateway operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Finished,
    Error,
    Canceled,
    /// Any status this client does not know; polled like PENDING
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::Canceled => "CANCELED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperationStatusResponse {
    pub status: OperationStatus,
}
