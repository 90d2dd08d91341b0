//! SQL gateway protocol: session negotiation and statement execution.

pub mod executor;
pub mod session;

pub use executor::{
    FailurePolicy, FileExecutionReport, OperationOutcome, OperationPoller, StatementExecutor,
};
pub use session::{Session, SessionManager};
