//! Post-submission tracking of running jobs.

pub mod job_monitor;

pub use job_monitor::{CycleOutcome, JobMonitor, JobRecord, MonitorReport, MonitorStopReason};
