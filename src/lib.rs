//! # flinkpilot
//!
//! Submits Flink SQL job scripts to a cluster through the JobManager's SQL
//! gateway, waits for every statement to finish or fail, and then keeps an
//! eye on the resulting streaming jobs until nothing is left to watch.
//!
//! ## Features
//!
//! - **Statement Splitting**: Comment-aware, line-oriented splitting of job scripts
//! - **Protocol Fallback**: SQL gateway sessions with a direct-submission fallback
//! - **Bounded Polling**: Operation status polling with fixed interval and timeout
//! - **Failure Policies**: Tolerant DDL files, strict streaming files
//! - **Job Monitoring**: Terminal-state detection with an idle-stop heuristic
//! - **Testable Time**: Every wait goes through an injectable [`Clock`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flinkpilot::{JobSubmissionOrchestrator, PilotConfig, RestClusterClient, TokioClock};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PilotConfig::from_env();
//!     let api = Arc::new(RestClusterClient::new(&config)?);
//!
//!     let orchestrator = JobSubmissionOrchestrator::new(api, Arc::new(TokioClock), config);
//!     let report = orchestrator.run().await;
//!     std::process::exit(report.exit_code());
//! }
//! ```

#![allow(clippy::collapsible_if)]

pub mod flinkpilot;

pub use flinkpilot::clock::{Clock, SimulatedClock, TokioClock};
pub use flinkpilot::cluster::{
    ClusterApi, ClusterHealthProbe, ClusterSnapshot, JobControl, JobInfo, JobState,
    MockClusterApi, OperationStatus, RestClusterClient,
};
pub use flinkpilot::config::PilotConfig;
pub use flinkpilot::error::{PilotError, PilotResult};
pub use flinkpilot::gateway::{
    FailurePolicy, FileExecutionReport, Session, SessionManager, StatementExecutor,
};
pub use flinkpilot::monitor::{JobMonitor, MonitorReport, MonitorStopReason};
pub use flinkpilot::shutdown::{ShutdownCoordinator, ShutdownListener, ShutdownSignal};
pub use flinkpilot::sql::{Statement, StatementParser};
pub use flinkpilot::submission::{JobSubmissionOrchestrator, SubmissionPhase, SubmissionReport};
