//! Statement execution under a negotiated [`Session`]
//!
//! # Gateway mode
//!
//! The statement is submitted together with the execution config and the
//! returned operation is polled by an [`OperationPoller`]:
//!
//! ```text
//!   submit ──► poll ──► PENDING / RUNNING / unknown ──► sleep(interval) ──► poll
//!                 │
//!                 ├──► FINISHED ──────────────────────► success
//!                 ├──► ERROR / CANCELED ──► fetch result page 0 ──► failure
//!                 ├──► status call fails ─────────────► failure
//!                 └──► timeout elapsed ───────────────► failure
//! ```
//!
//! The result page fetched on failure is only logged; whether it can be read
//! has no influence on the outcome.
//!
//! # Direct mode
//!
//! Without a gateway nothing is actually executed. Table and catalog DDL is
//! acknowledged, `INSERT INTO` is rejected because a streaming job cannot be
//! expressed through the jar API, everything else is acknowledged.

use super::session::Session;
use crate::flinkpilot::cluster::client::ClusterApi;
use crate::flinkpilot::cluster::models::{
    OperationHandle, OperationStatus, SessionHandle, StatementRequest,
};
use crate::flinkpilot::clock::Clock;
use crate::flinkpilot::config::PilotConfig;
use crate::flinkpilot::error::{PilotError, PilotResult};
use crate::flinkpilot::sql::{Statement, StatementKind, StatementParser};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// What happens to the rest of a file when one statement fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and continue with the next statement
    Tolerant,
    /// Abort the remaining statements of the file
    Strict,
}

/// Terminal result of polling one gateway operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Finished,
    /// ERROR or CANCELED
    Failed(OperationStatus),
    /// The status endpoint itself failed
    StatusUnavailable,
    TimedOut,
}

impl OperationOutcome {
    /// Terminal outcome for a polled status, `None` to keep polling
    pub fn from_status(status: OperationStatus) -> Option<Self> {
        match status {
            OperationStatus::Finished => Some(Self::Finished),
            OperationStatus::Error | OperationStatus::Canceled => Some(Self::Failed(status)),
            OperationStatus::Pending | OperationStatus::Running | OperationStatus::Unknown => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Bounded polling of one operation's status
pub struct OperationPoller<'a> {
    api: &'a dyn ClusterApi,
    clock: &'a dyn Clock,
    session: &'a SessionHandle,
    operation: &'a OperationHandle,
    interval: Duration,
    timeout: Duration,
}

impl<'a> OperationPoller<'a> {
    pub fn new(
        api: &'a dyn ClusterApi,
        clock: &'a dyn Clock,
        session: &'a SessionHandle,
        operation: &'a OperationHandle,
    ) -> Self {
        Self {
            api,
            clock,
            session,
            operation,
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self) -> OperationOutcome {
        let start = self.clock.now();

        while self.clock.elapsed_since(start) < self.timeout {
            let status = match self.api.operation_status(self.session, self.operation).await {
                Ok(status) => status,
                Err(e) => {
                    error!("Error checking operation status: {}", e);
                    return OperationOutcome::StatusUnavailable;
                }
            };
            debug!("Operation {} status: {}", self.operation, status);

            if let Some(outcome) = OperationOutcome::from_status(status) {
                return outcome;
            }
            if status == OperationStatus::Unknown {
                warn!("Operation {} reported an unrecognized status", self.operation);
            }

            self.clock.sleep(self.interval).await;
        }

        warn!(
            "{}",
            PilotError::timeout(format!("Operation {}", self.operation), self.timeout)
        );
        OperationOutcome::TimedOut
    }
}

/// Outcome of running all statements of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExecutionReport {
    pub source: String,
    /// Statements parsed from the file
    pub total: usize,
    /// Statements actually sent to the executor
    pub attempted: usize,
    pub succeeded: usize,
    /// 0-based indexes of failed statements
    pub failed: Vec<usize>,
    /// A strict file stopped at its first failure
    pub aborted: bool,
}

impl FileExecutionReport {
    fn new(source: &str, total: usize) -> Self {
        Self {
            source: source.to_string(),
            total,
            attempted: 0,
            succeeded: 0,
            failed: Vec::new(),
            aborted: false,
        }
    }

    /// At least one statement succeeded and a strict file ran to the end
    pub fn is_success(&self) -> bool {
        self.succeeded > 0 && !self.aborted
    }
}

impl fmt::Display for FileExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Executed {}/{} statements from {}",
            self.succeeded, self.total, self.source
        )?;
        if self.aborted {
            write!(f, " (aborted after statement {})", self.attempted)?;
        }
        Ok(())
    }
}

/// Runs statements one at a time under a session
pub struct StatementExecutor {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    parser: StatementParser,
    execution_config: BTreeMap<String, String>,
    poll_interval: Duration,
    operation_timeout: Duration,
    pacing: Duration,
}

impl StatementExecutor {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, config: &PilotConfig) -> Self {
        Self {
            api,
            clock,
            parser: StatementParser::new(),
            execution_config: config.session.execution_config(),
            poll_interval: config.operation_poll_interval,
            operation_timeout: config.operation_timeout,
            pacing: config.statement_pacing,
        }
    }

    /// Execute one statement; `true` on success
    pub async fn execute(&self, statement: &Statement, session: &Session) -> bool {
        match session {
            Session::Gateway(handle) => self.execute_via_gateway(statement, handle).await,
            Session::Direct => Self::execute_direct(statement),
        }
    }

    async fn execute_via_gateway(&self, statement: &Statement, session: &SessionHandle) -> bool {
        let request = StatementRequest {
            statement: statement.text.clone(),
            execution_config: self.execution_config.clone(),
        };

        let operation = match self.api.submit_statement(session, &request).await {
            Ok(operation) => operation,
            Err(e) => {
                error!("Failed to execute SQL statement: {}", e);
                return false;
            }
        };
        info!(
            "SQL statement submitted with operation handle: {}",
            operation
        );

        let outcome = OperationPoller::new(
            self.api.as_ref(),
            self.clock.as_ref(),
            session,
            &operation,
        )
        .with_interval(self.poll_interval)
        .with_timeout(self.operation_timeout)
        .run()
        .await;

        match outcome {
            OperationOutcome::Finished => {
                info!("Operation completed successfully");
                true
            }
            OperationOutcome::Failed(status) => {
                error!("Operation failed with status: {}", status);
                self.capture_diagnostics(session, &operation).await;
                false
            }
            OperationOutcome::StatusUnavailable | OperationOutcome::TimedOut => false,
        }
    }

    /// Best-effort read of the first result page of a failed operation
    async fn capture_diagnostics(&self, session: &SessionHandle, operation: &OperationHandle) {
        match self.api.operation_result(session, operation).await {
            Ok(result) => debug!("Operation result: {}", result),
            Err(e) => debug!("Could not get operation result: {}", e),
        }
    }

    fn execute_direct(statement: &Statement) -> bool {
        info!(
            "Would execute via direct submission: {}",
            statement.preview(100)
        );
        match statement.kind() {
            StatementKind::CreateTable | StatementKind::CreateCatalog => {
                info!("Table/Catalog creation statement - assuming success");
                true
            }
            StatementKind::Insert => {
                warn!(
                    "INSERT statement requires actual job submission - not supported in direct mode"
                );
                false
            }
            StatementKind::Other => true,
        }
    }

    /// Execute parsed statements in order, applying `policy` on failure
    pub async fn execute_statements(
        &self,
        statements: &[Statement],
        source: &str,
        session: &Session,
        policy: FailurePolicy,
    ) -> FileExecutionReport {
        let total = statements.len();
        let mut report = FileExecutionReport::new(source, total);

        for (position, statement) in statements.iter().enumerate() {
            if position > 0 {
                self.clock.sleep(self.pacing).await;
            }

            info!(
                "Executing SQL statement {}/{} from {} ({})",
                position + 1,
                total,
                source,
                statement.kind()
            );
            debug!("Statement: {}", statement.preview(100));

            report.attempted += 1;
            if self.execute(statement, session).await {
                report.succeeded += 1;
                info!("✓ Statement {} executed successfully", position + 1);
                continue;
            }

            error!("✗ Statement {} failed", position + 1);
            report.failed.push(statement.index);
            if policy == FailurePolicy::Strict {
                report.aborted = true;
                break;
            }
        }

        info!("{}", report);
        report
    }

    /// Parse a script held in memory and execute it
    pub async fn execute_script(
        &self,
        text: &str,
        source: &str,
        session: &Session,
        policy: FailurePolicy,
    ) -> FileExecutionReport {
        let statements = self.parser.parse_from(text, source);
        self.execute_statements(&statements, source, session, policy)
            .await
    }

    /// Read, parse and execute a script file
    pub async fn execute_file(
        &self,
        path: &Path,
        session: &Session,
        policy: FailurePolicy,
    ) -> PilotResult<FileExecutionReport> {
        let statements = self.parser.parse_file(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self
            .execute_statements(&statements, &source, session, policy)
            .await)
    }
}
