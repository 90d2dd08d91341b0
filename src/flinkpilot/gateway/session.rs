//! Submission protocol negotiation
//!
//! The preferred protocol is an interactive SQL gateway session. When the
//! gateway cannot open one, the JobManager's jar listing is probed; if that
//! answers, the run continues in [`Session::Direct`] mode, which can only
//! acknowledge DDL (see [`StatementExecutor`](super::executor::StatementExecutor)).

use crate::flinkpilot::cluster::client::ClusterApi;
use crate::flinkpilot::cluster::models::{SessionHandle, SessionRequest};
use crate::flinkpilot::config::SessionProperties;
use crate::flinkpilot::error::{PilotError, PilotResult};
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;

/// A negotiated submission context, valid for one orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// SQL gateway session; statements run as asynchronous operations
    Gateway(SessionHandle),
    /// No gateway available; the JobManager only answers the jar API
    Direct,
}

impl Session {
    pub fn handle(&self) -> Option<&SessionHandle> {
        match self {
            Session::Gateway(handle) => Some(handle),
            Session::Direct => None,
        }
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self, Session::Gateway(_))
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Gateway(handle) => write!(f, "gateway session {}", handle),
            Session::Direct => write!(f, "direct submission"),
        }
    }
}

pub struct SessionManager {
    api: Arc<dyn ClusterApi>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Open a gateway session, falling back to direct mode
    ///
    /// Fails with [`PilotError::NoSubmissionMethod`] when neither protocol is
    /// available; callers treat that as fatal for the run.
    pub async fn create_session(&self, properties: &SessionProperties) -> PilotResult<Session> {
        let request = SessionRequest {
            session_name: properties.session_name.clone(),
            planner: properties.planner.clone(),
            execution_type: properties.execution_type.clone(),
            properties: properties.session_properties(),
        };

        match self.api.create_session(&request).await {
            Ok(handle) => {
                info!("Created SQL session: {}", handle);
                return Ok(Session::Gateway(handle));
            }
            Err(e) if e.is_transport() => {
                warn!("SQL Gateway not available, trying direct submission: {}", e);
            }
            Err(e) => {
                warn!("Failed to create SQL session: {}", e);
            }
        }

        self.probe_direct_submission().await
    }

    async fn probe_direct_submission(&self) -> PilotResult<Session> {
        match self.api.jars().await {
            Ok(_) => {
                info!("Using direct job submission API (no SQL Gateway)");
                Ok(Session::Direct)
            }
            Err(e) => {
                error!("No available job submission method: {}", e);
                Err(PilotError::NoSubmissionMethod {
                    message: e.to_string(),
                })
            }
        }
    }
}
