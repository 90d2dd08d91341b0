//! Scripted in-memory [`ClusterApi`] for tests
//!
//! Each endpoint replays a queue of responses. The last queued response is
//! repeated once the queue is down to one entry, so a single `with_overview`
//! answers every probe. Endpoints with nothing scripted fail like an
//! unreachable cluster. Every call is recorded as a [`MockCall`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mock = Arc::new(
//!     MockClusterApi::new()
//!         .with_session("s-1")
//!         .with_statement_handles(["op-1"])
//!         .with_operation_statuses("op-1", [OperationStatus::Pending, OperationStatus::Finished]),
//! );
//! let api: Arc<dyn ClusterApi> = mock.clone();
//! ```

use super::client::ClusterApi;
use super::models::{
    ClusterOverview, JobDetail, JobState, JobSummary, JobsOverview, OperationHandle,
    OperationStatus, SessionHandle, SessionRequest, StatementRequest, TaskManagerInfo,
};
use crate::flinkpilot::error::{PilotError, PilotResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// How a scripted call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Connection refused / timed out
    Transport,
    /// Non-success HTTP status
    Status(u16),
}

impl MockFailure {
    fn into_error(self, endpoint: &str) -> PilotError {
        let url = format!("mock://{}", endpoint);
        match self {
            MockFailure::Transport => PilotError::Http {
                url,
                message: "connection refused".to_string(),
            },
            MockFailure::Status(status) => PilotError::Status {
                url,
                status,
                body: String::new(),
            },
        }
    }
}

/// A recorded call against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Overview,
    ListJobs,
    JobDetail(String),
    CancelJob(String),
    JobMetrics(String),
    TaskManagers,
    Jars,
    CreateSession(SessionRequest),
    SubmitStatement {
        session: SessionHandle,
        statement: String,
    },
    OperationStatus(OperationHandle),
    OperationResult(OperationHandle),
}

type Scripted<T> = Result<T, MockFailure>;

#[derive(Debug)]
struct Script<T> {
    queue: VecDeque<Scripted<T>>,
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Option<Scripted<T>> {
        if self.queue.len() > 1 {
            self.queue.pop_front()
        } else {
            self.queue.front().cloned()
        }
    }

    fn push(&mut self, response: Scripted<T>) {
        self.queue.push_back(response);
    }
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    overview: Script<ClusterOverview>,
    jobs: Script<JobsOverview>,
    job_details: HashMap<String, Script<JobDetail>>,
    cancels: HashMap<String, Scripted<()>>,
    metrics: Script<serde_json::Value>,
    taskmanagers: Script<Vec<TaskManagerInfo>>,
    jars: Script<serde_json::Value>,
    sessions: Script<SessionHandle>,
    statements: Script<OperationHandle>,
    operation_statuses: HashMap<OperationHandle, Script<OperationStatus>>,
    operation_result: Script<serde_json::Value>,
    calls: Vec<MockCall>,
}

/// Mock cluster for testing without a JobManager
#[derive(Debug, Default)]
pub struct MockClusterApi {
    state: Mutex<MockState>,
}

impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ----- builder-style scripting -----

    pub fn with_overview(self, overview: ClusterOverview) -> Self {
        self.push_overview(Ok(overview));
        self
    }

    pub fn with_jobs(self, jobs: Vec<JobSummary>) -> Self {
        self.push_jobs(Ok(jobs));
        self
    }

    pub fn with_job_state(self, job_id: &str, state: JobState) -> Self {
        self.push_job_state(job_id, Ok(state));
        self
    }

    pub fn with_session(self, handle: &str) -> Self {
        self.lock()
            .sessions
            .push(Ok(SessionHandle(handle.to_string())));
        self
    }

    pub fn with_session_failure(self, failure: MockFailure) -> Self {
        self.lock().sessions.push(Err(failure));
        self
    }

    pub fn with_jars(self) -> Self {
        self.lock()
            .jars
            .push(Ok(serde_json::json!({ "address": "mock", "files": [] })));
        self
    }

    pub fn with_jars_failure(self, failure: MockFailure) -> Self {
        self.lock().jars.push(Err(failure));
        self
    }

    /// One operation handle per submitted statement, in order
    pub fn with_statement_handles<I, S>(self, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.lock();
            for handle in handles {
                state.statements.push(Ok(OperationHandle(handle.into())));
            }
        }
        self
    }

    pub fn with_statement_failure(self, failure: MockFailure) -> Self {
        self.lock().statements.push(Err(failure));
        self
    }

    /// Status sequence returned by successive polls of `operation`
    pub fn with_operation_statuses<I>(self, operation: &str, statuses: I) -> Self
    where
        I: IntoIterator<Item = OperationStatus>,
    {
        {
            let mut state = self.lock();
            let script = state
                .operation_statuses
                .entry(OperationHandle(operation.to_string()))
                .or_default();
            for status in statuses {
                script.push(Ok(status));
            }
        }
        self
    }

    pub fn with_operation_status_failure(self, operation: &str, failure: MockFailure) -> Self {
        self.lock()
            .operation_statuses
            .entry(OperationHandle(operation.to_string()))
            .or_default()
            .push(Err(failure));
        self
    }

    pub fn with_operation_result(self, result: serde_json::Value) -> Self {
        self.lock().operation_result.push(Ok(result));
        self
    }

    pub fn with_cancel(self, job_id: &str, result: Result<(), MockFailure>) -> Self {
        self.lock().cancels.insert(job_id.to_string(), result);
        self
    }

    pub fn with_job_detail(self, job_id: &str, detail: JobDetail) -> Self {
        self.lock()
            .job_details
            .entry(job_id.to_string())
            .or_default()
            .push(Ok(detail));
        self
    }

    pub fn with_metrics(self, metrics: serde_json::Value) -> Self {
        self.lock().metrics.push(Ok(metrics));
        self
    }

    pub fn with_taskmanagers(self, taskmanagers: Vec<TaskManagerInfo>) -> Self {
        self.lock().taskmanagers.push(Ok(taskmanagers));
        self
    }

    // ----- scripting after construction -----

    pub fn push_overview(&self, response: Scripted<ClusterOverview>) {
        self.lock().overview.push(response);
    }

    pub fn push_jobs(&self, response: Scripted<Vec<JobSummary>>) {
        self.lock()
            .jobs
            .push(response.map(|jobs| JobsOverview { jobs }));
    }

    /// Queue a state for `GET /jobs/{id}`; other detail fields are filled in
    pub fn push_job_state(&self, job_id: &str, state: Scripted<JobState>) {
        let detail = state.map(|state| JobDetail {
            name: format!("job-{}", job_id),
            state,
            start_time: Some(0),
            end_time: None,
            duration: None,
            parallelism: Some(1),
        });
        self.lock()
            .job_details
            .entry(job_id.to_string())
            .or_default()
            .push(detail);
    }

    // ----- inspection -----

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls<F>(&self, predicate: F) -> usize
    where
        F: Fn(&MockCall) -> bool,
    {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Statement texts in submission order
    pub fn submitted_statements(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MockCall::SubmitStatement { statement, .. } => Some(statement.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.lock().calls.push(call);
    }
}

fn replay<T>(next: Option<Scripted<T>>, endpoint: &str) -> PilotResult<T> {
    match next {
        Some(Ok(value)) => Ok(value),
        Some(Err(failure)) => Err(failure.into_error(endpoint)),
        None => Err(MockFailure::Transport.into_error(endpoint)),
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn overview(&self) -> PilotResult<ClusterOverview> {
        self.record(MockCall::Overview);
        let next = self.lock().overview.next();
        replay(next, "overview")
    }

    async fn list_jobs(&self) -> PilotResult<JobsOverview> {
        self.record(MockCall::ListJobs);
        let next = self.lock().jobs.next();
        replay(next, "jobs")
    }

    async fn job_detail(&self, job_id: &str) -> PilotResult<JobDetail> {
        self.record(MockCall::JobDetail(job_id.to_string()));
        let next = self
            .lock()
            .job_details
            .get_mut(job_id)
            .and_then(|script| script.next());
        match next {
            Some(result) => replay(Some(result), "jobs/{id}"),
            None => Err(MockFailure::Status(404).into_error("jobs/{id}")),
        }
    }

    async fn cancel_job(&self, job_id: &str) -> PilotResult<()> {
        self.record(MockCall::CancelJob(job_id.to_string()));
        let scripted = self
            .lock()
            .cancels
            .get(job_id)
            .cloned()
            .unwrap_or(Err(MockFailure::Status(404)));
        replay(Some(scripted), "jobs/{id} PATCH")
    }

    async fn job_metrics(&self, job_id: &str) -> PilotResult<serde_json::Value> {
        self.record(MockCall::JobMetrics(job_id.to_string()));
        let next = self.lock().metrics.next();
        replay(next, "jobs/{id}/metrics")
    }

    async fn taskmanagers(&self) -> PilotResult<Vec<TaskManagerInfo>> {
        self.record(MockCall::TaskManagers);
        let next = self.lock().taskmanagers.next();
        replay(next, "taskmanagers")
    }

    async fn jars(&self) -> PilotResult<serde_json::Value> {
        self.record(MockCall::Jars);
        let next = self.lock().jars.next();
        replay(next, "jars")
    }

    async fn create_session(&self, request: &SessionRequest) -> PilotResult<SessionHandle> {
        self.record(MockCall::CreateSession(request.clone()));
        let next = self.lock().sessions.next();
        replay(next, "v1/sessions")
    }

    async fn submit_statement(
        &self,
        session: &SessionHandle,
        request: &StatementRequest,
    ) -> PilotResult<OperationHandle> {
        self.record(MockCall::SubmitStatement {
            session: session.clone(),
            statement: request.statement.clone(),
        });
        // Statements consume handles strictly; the last one is not repeated.
        let next = self.lock().statements.queue.pop_front();
        replay(next, "v1/sessions/{h}/statements")
    }

    async fn operation_status(
        &self,
        _session: &SessionHandle,
        operation: &OperationHandle,
    ) -> PilotResult<OperationStatus> {
        self.record(MockCall::OperationStatus(operation.clone()));
        let next = self
            .lock()
            .operation_statuses
            .get_mut(operation)
            .and_then(|script| script.next());
        replay(next, "v1/sessions/{h}/operations/{op}/status")
    }

    async fn operation_result(
        &self,
        _session: &SessionHandle,
        operation: &OperationHandle,
    ) -> PilotResult<serde_json::Value> {
        self.record(MockCall::OperationResult(operation.clone()));
        let next = self.lock().operation_result.next();
        replay(next, "v1/sessions/{h}/operations/{op}/result/0")
    }
}
