//! JobManager access: REST client, wire models, health probing and job
//! lifecycle operations.

pub mod client;
pub mod health;
pub mod jobs;
pub mod mock;
pub mod models;

pub use client::{ClusterApi, RestClusterClient};
pub use health::{ClusterHealthProbe, ClusterSnapshot};
pub use jobs::{JobControl, JobInfo};
pub use mock::{MockCall, MockClusterApi, MockFailure};
pub use models::{
    ClusterOverview, JobDetail, JobState, JobSummary, JobsOverview, OperationHandle,
    OperationStatus, SessionHandle, SessionRequest, StatementRequest, TaskManagerInfo,
};
