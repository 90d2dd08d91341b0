//! HTTP access to the JobManager REST API and its SQL gateway
//!
//! [`ClusterApi`] is the seam every component talks through. The production
//! implementation is [`RestClusterClient`]; tests use
//! [`MockClusterApi`](super::mock::MockClusterApi).
//!
//! Every method returns `PilotResult`; deciding whether an error means
//! "unhealthy", "statement failed" or "retry next cycle" is left to callers.

use super::models::{
    ClusterOverview, JobDetail, JobsOverview, OperationHandle, OperationStatus,
    OperationStatusResponse, SessionHandle, SessionRequest, SessionResponse, StatementRequest,
    StatementResponse, TaskManagerInfo, TaskManagerList,
};
use crate::flinkpilot::config::PilotConfig;
use crate::flinkpilot::error::{PilotError, PilotResult};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `GET /overview`
    async fn overview(&self) -> PilotResult<ClusterOverview>;

    /// `GET /jobs`
    async fn list_jobs(&self) -> PilotResult<JobsOverview>;

    /// `GET /jobs/{id}`
    async fn job_detail(&self, job_id: &str) -> PilotResult<JobDetail>;

    /// `PATCH /jobs/{id}`; only `202 Accepted` counts as success
    async fn cancel_job(&self, job_id: &str) -> PilotResult<()>;

    /// `GET /jobs/{id}/metrics`
    async fn job_metrics(&self, job_id: &str) -> PilotResult<serde_json::Value>;

    /// `GET /taskmanagers`
    async fn taskmanagers(&self) -> PilotResult<Vec<TaskManagerInfo>>;

    /// `GET /jars`, the direct-submission capability probe
    async fn jars(&self) -> PilotResult<serde_json::Value>;

    /// `POST /v1/sessions`
    async fn create_session(&self, request: &SessionRequest) -> PilotResult<SessionHandle>;

    /// `POST /v1/sessions/{h}/statements`
    async fn submit_statement(
        &self,
        session: &SessionHandle,
        request: &StatementRequest,
    ) -> PilotResult<OperationHandle>;

    /// `GET /v1/sessions/{h}/operations/{op}/status`
    async fn operation_status(
        &self,
        session: &SessionHandle,
        operation: &OperationHandle,
    ) -> PilotResult<OperationStatus>;

    /// `GET /v1/sessions/{h}/operations/{op}/result/0`
    async fn operation_result(
        &self,
        session: &SessionHandle,
        operation: &OperationHandle,
    ) -> PilotResult<serde_json::Value>;
}

/// `reqwest`-backed client with per-call timeouts
#[derive(Debug, Clone)]
pub struct RestClusterClient {
    client: Client,
    base_url: String,
    gateway_url: String,
    read_timeout: Duration,
    session_timeout: Duration,
    submit_timeout: Duration,
}

impl RestClusterClient {
    pub fn new(config: &PilotConfig) -> PilotResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PilotError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            gateway_url: config.gateway_url(),
            read_timeout: config.read_timeout,
            session_timeout: config.session_timeout,
            submit_timeout: config.submit_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, url: &str, timeout: Duration) -> RequestBuilder {
        self.client.request(method, url).timeout(timeout)
    }

    async fn send(&self, url: &str, builder: RequestBuilder) -> PilotResult<Response> {
        debug!("HTTP {}", url);
        builder.send().await.map_err(|e| PilotError::http(url, &e))
    }

    async fn expect_success(url: &str, response: Response) -> PilotResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PilotError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> PilotResult<T> {
        response.json::<T>().await.map_err(|e| PilotError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> PilotResult<T> {
        let builder = self.request(Method::GET, &url, self.read_timeout);
        let response = self.send(&url, builder).await?;
        let response = Self::expect_success(&url, response).await?;
        Self::decode(&url, response).await
    }

    fn session_url(&self, session: &SessionHandle) -> String {
        format!("{}/sessions/{}", self.gateway_url, session)
    }
}

#[async_trait]
impl ClusterApi for RestClusterClient {
    async fn overview(&self) -> PilotResult<ClusterOverview> {
        self.get_json(format!("{}/overview", self.base_url)).await
    }

    async fn list_jobs(&self) -> PilotResult<JobsOverview> {
        self.get_json(format!("{}/jobs", self.base_url)).await
    }

    async fn job_detail(&self, job_id: &str) -> PilotResult<JobDetail> {
        self.get_json(format!("{}/jobs/{}", self.base_url, job_id))
            .await
    }

    async fn cancel_job(&self, job_id: &str) -> PilotResult<()> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let builder = self.request(Method::PATCH, &url, self.read_timeout);
        let response = self.send(&url, builder).await?;

        if response.status() == StatusCode::ACCEPTED {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(PilotError::Status { url, status, body })
    }

    async fn job_metrics(&self, job_id: &str) -> PilotResult<serde_json::Value> {
        self.get_json(format!("{}/jobs/{}/metrics", self.base_url, job_id))
            .await
    }

    async fn taskmanagers(&self) -> PilotResult<Vec<TaskManagerInfo>> {
        let list: TaskManagerList = self
            .get_json(format!("{}/taskmanagers", self.base_url))
            .await?;
        Ok(list.taskmanagers)
    }

    async fn jars(&self) -> PilotResult<serde_json::Value> {
        self.get_json(format!("{}/jars", self.base_url)).await
    }

    async fn create_session(&self, request: &SessionRequest) -> PilotResult<SessionHandle> {
        let url = format!("{}/sessions", self.gateway_url);
        let builder = self
            .request(Method::POST, &url, self.session_timeout)
            .json(request);
        let response = self.send(&url, builder).await?;
        let response = Self::expect_success(&url, response).await?;
        let body: SessionResponse = Self::decode(&url, response).await?;
        Ok(body.session_handle)
    }

    async fn submit_statement(
        &self,
        session: &SessionHandle,
        request: &StatementRequest,
    ) -> PilotResult<OperationHandle> {
        let url = format!("{}/statements", self.session_url(session));
        let builder = self
            .request(Method::POST, &url, self.submit_timeout)
            .json(request);
        let response = self.send(&url, builder).await?;
        let response = Self::expect_success(&url, response).await?;
        let body: StatementResponse = Self::decode(&url, response).await?;
        Ok(body.operation_handle)
    }

    async fn operation_status(
        &self,
        session: &SessionHandle,
        operation: &OperationHandle,
    ) -> PilotResult<OperationStatus> {
        let url = format!(
            "{}/operations/{}/status",
            self.session_url(session),
            operation
        );
        let body: OperationStatusResponse = self.get_json(url).await?;
        Ok(body.status)
    }

    async fn operation_result(
        &self,
        session: &SessionHandle,
        operation: &OperationHandle,
    ) -> PilotResult<serde_json::Value> {
        let url = format!(
            "{}/operations/{}/result/0",
            self.session_url(session),
            operation
        );
        self.get_json(url).await
    }
}
