//! Submission run: readiness wait, session, DDL file, streaming file.

pub mod orchestrator;

pub use orchestrator::{JobSubmissionOrchestrator, SubmissionPhase, SubmissionReport};
