//! One submission run, strictly sequential:
//!
//! ```text
//! AwaitCluster ──► AcquireSession ──► ExecuteDdlFile ──► ExecuteStreamingFile ──► Done
//!      │                 │              (tolerant)             (strict)
//!      └─────────────────┴──────────────────────────────────────┴──────────────► Failed
//! ```
//!
//! A DDL file without a single successful statement is logged and the run
//! continues. A missing script is skipped with a warning.

use crate::flinkpilot::cluster::client::ClusterApi;
use crate::flinkpilot::cluster::health::ClusterHealthProbe;
use crate::flinkpilot::clock::Clock;
use crate::flinkpilot::config::PilotConfig;
use crate::flinkpilot::gateway::{
    FailurePolicy, FileExecutionReport, Session, SessionManager, StatementExecutor,
};
use log::{error, info, warn};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    AwaitCluster,
    AcquireSession,
    ExecuteDdlFile,
    ExecuteStreamingFile,
    Done,
    Failed,
}

impl fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionPhase::AwaitCluster => "await-cluster",
            SubmissionPhase::AcquireSession => "acquire-session",
            SubmissionPhase::ExecuteDdlFile => "execute-ddl",
            SubmissionPhase::ExecuteStreamingFile => "execute-streaming",
            SubmissionPhase::Done => "done",
            SubmissionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a submission run did
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    /// `Done` or `Failed`
    pub phase: SubmissionPhase,
    /// Phase in which the run failed
    pub failed_in: Option<SubmissionPhase>,
    pub failure: Option<String>,
    pub session: Option<Session>,
    pub ddl: Option<FileExecutionReport>,
    pub streaming: Option<FileExecutionReport>,
}

impl SubmissionReport {
    fn new() -> Self {
        Self {
            phase: SubmissionPhase::AwaitCluster,
            failed_in: None,
            failure: None,
            session: None,
            ddl: None,
            streaming: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.phase == SubmissionPhase::Done
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    fn fail(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!("Submission failed during {}: {}", self.phase, reason);
        self.failed_in = Some(self.phase);
        self.failure = Some(reason);
        self.phase = SubmissionPhase::Failed;
        self
    }
}

pub struct JobSubmissionOrchestrator {
    config: PilotConfig,
    clock: Arc<dyn Clock>,
    probe: ClusterHealthProbe,
    sessions: SessionManager,
    executor: StatementExecutor,
}

impl JobSubmissionOrchestrator {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, config: PilotConfig) -> Self {
        Self {
            probe: ClusterHealthProbe::new(Arc::clone(&api), Arc::clone(&clock), &config),
            sessions: SessionManager::new(Arc::clone(&api)),
            executor: StatementExecutor::new(api, Arc::clone(&clock), &config),
            clock,
            config,
        }
    }

    /// Run all phases once
    pub async fn run(&self) -> SubmissionReport {
        info!("Starting job submission process...");
        let mut report = SubmissionReport::new();

        if !self.probe.wait_for_jobmanager().await {
            return report.fail(format!(
                "JobManager at {} not reachable",
                self.config.base_url()
            ));
        }

        report.phase = SubmissionPhase::AcquireSession;
        let session = match self.sessions.create_session(&self.config.session).await {
            Ok(session) => session,
            Err(e) => return report.fail(format!("failed to create SQL session: {}", e)),
        };
        info!("Submitting with {}", session);
        report.session = Some(session.clone());

        report.phase = SubmissionPhase::ExecuteDdlFile;
        let ddl_path = self.config.ddl_path();
        if ddl_path.exists() {
            info!("Creating tables...");
            let ddl = self
                .run_file(&ddl_path, &session, FailurePolicy::Tolerant)
                .await;
            if !ddl.as_ref().is_some_and(FileExecutionReport::is_success) {
                warn!("Some table creation statements failed, continuing anyway");
            }
            report.ddl = ddl;
            self.clock.sleep(self.config.ddl_settle_delay).await;
        } else {
            warn!("Table creation file not found: {}", ddl_path.display());
        }

        report.phase = SubmissionPhase::ExecuteStreamingFile;
        let streaming_path = self.config.streaming_path();
        if streaming_path.exists() {
            info!("Submitting streaming jobs...");
            let streaming = self
                .run_file(&streaming_path, &session, FailurePolicy::Strict)
                .await;
            let ok = streaming
                .as_ref()
                .is_some_and(FileExecutionReport::is_success);
            report.streaming = streaming;
            if !ok {
                return report.fail("failed to submit streaming jobs");
            }
            info!("✓ Streaming jobs submitted successfully");
        } else {
            warn!(
                "Streaming job file not found: {}",
                streaming_path.display()
            );
        }

        report.phase = SubmissionPhase::Done;
        info!("All jobs submitted successfully");
        report
    }

    async fn run_file(
        &self,
        path: &Path,
        session: &Session,
        policy: FailurePolicy,
    ) -> Option<FileExecutionReport> {
        match self.executor.execute_file(path, session, policy).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Error executing SQL file {}: {}", path.display(), e);
                None
            }
        }
    }
}
