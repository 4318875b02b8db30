//! The external job client seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use batchrun_core::pipeline::PipelineMode;
use batchrun_core::types::DbId;

use crate::api::{WorkbenchApi, WorkbenchApiError};
use crate::orchestrator::{ExecuteBatchRequest, OrchestratorApi};

/// Everything the orchestration layer needs to start a workbench job.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitJobRequest {
    pub run_id: DbId,
    pub input_path_prefix: String,
    pub output_path_prefix: String,
    pub report_path_prefix: Option<String>,
    pub workflow_name: String,
    pub request_id: Option<String>,
    pub mode: PipelineMode,
}

/// A job accepted by the workbench.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedJob {
    pub external_job_id: String,
    /// Initial status reported at submission, e.g. `queued`.
    pub status: String,
}

/// A status report for a workbench job.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteJobStatus {
    /// Raw status string as reported by the workbench.
    pub status: String,
    pub error_detail: Option<String>,
}

/// Failures of the external job client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobClientError {
    /// Submission failed. `retriable` tells whether repeating the call
    /// could succeed.
    #[error("Job submission failed: {message}")]
    Submission { message: String, retriable: bool },

    /// Transient status query failure.
    #[error("Job status query failed: {message}")]
    Query { message: String },

    /// The workbench has no record of the job. Permanent.
    #[error("Workbench has no record of job {external_job_id}")]
    NotFoundRemote { external_job_id: String },
}

impl JobClientError {
    pub fn is_retriable(&self) -> bool {
        match self {
            JobClientError::Submission { retriable, .. } => *retriable,
            JobClientError::Query { .. } => true,
            JobClientError::NotFoundRemote { .. } => false,
        }
    }
}

/// Remote job operations used by the submission flow and the reconciler.
#[async_trait]
pub trait ExternalJobClient: Send + Sync {
    /// Submit a run for execution and return the workbench job id.
    async fn submit_job(&self, request: &SubmitJobRequest) -> Result<SubmittedJob, JobClientError>;

    /// Query the status of a previously submitted job.
    async fn get_job_status(&self, external_job_id: &str) -> Result<RemoteJobStatus, JobClientError>;
}

/// Connection settings for [`HttpJobClient`].
#[derive(Debug, Clone)]
pub struct WorkbenchConfig {
    /// Orchestration service base URL (submission).
    pub orchestrator_url: String,
    /// Workbench API base URL (status queries, forwarded on submission).
    pub workbench_url: String,
    /// Per-request timeout applied to every call.
    pub request_timeout: Duration,
}

impl WorkbenchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default                      |
    /// |---------------------|------------------------------|
    /// | `ORCHESTRATOR_URL`  | `http://batch-pipeline:8000` |
    /// | `WORKBENCH_API_URL` | `http://workbench-api:8080`  |
    /// | `HTTP_TIMEOUT_SECS` | `10`                         |
    pub fn from_env() -> Self {
        let orchestrator_url = std::env::var("ORCHESTRATOR_URL")
            .unwrap_or_else(|_| "http://batch-pipeline:8000".into());

        let workbench_url = std::env::var("WORKBENCH_API_URL")
            .unwrap_or_else(|_| "http://workbench-api:8080".into());

        let timeout_secs: u64 = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("HTTP_TIMEOUT_SECS must be a valid u64");

        Self {
            orchestrator_url,
            workbench_url,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// [`ExternalJobClient`] over HTTP, sharing one connection pool for both
/// the orchestration and the workbench endpoints.
pub struct HttpJobClient {
    orchestrator: OrchestratorApi,
    workbench: WorkbenchApi,
}

impl HttpJobClient {
    pub fn new(config: &WorkbenchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            orchestrator: OrchestratorApi::with_client(client.clone(), config.orchestrator_url.clone()),
            workbench: WorkbenchApi::with_client(client, config.workbench_url.clone()),
        })
    }
}

#[async_trait]
impl ExternalJobClient for HttpJobClient {
    async fn submit_job(&self, request: &SubmitJobRequest) -> Result<SubmittedJob, JobClientError> {
        let payload = ExecuteBatchRequest {
            pipeline_run_id: request.run_id,
            input_path_prefix: &request.input_path_prefix,
            output_path_prefix: &request.output_path_prefix,
            report_path_prefix: request.report_path_prefix.as_deref(),
            workbench_api_url: self.workbench.api_url(),
            request_id: request.request_id.as_deref(),
            workflow_name: &request.workflow_name,
            mode: request.mode.as_str(),
        };

        tracing::debug!(run_id = request.run_id, "Submitting run to orchestration");

        let response = self
            .orchestrator
            .execute_batch(&payload)
            .await
            .map_err(|e| submission_error(&e))?;

        match response.workbench_job_id.filter(|id| !id.trim().is_empty()) {
            Some(external_job_id) => Ok(SubmittedJob {
                external_job_id,
                status: response.status,
            }),
            None => Err(JobClientError::Submission {
                message: format!(
                    "Malformed orchestration response: missing workbench_job_id (status {}{})",
                    response.status,
                    response
                        .message
                        .map(|m| format!(", message: {m}"))
                        .unwrap_or_default(),
                ),
                retriable: false,
            }),
        }
    }

    async fn get_job_status(&self, external_job_id: &str) -> Result<RemoteJobStatus, JobClientError> {
        match self.workbench.get_job_status(external_job_id).await {
            Ok(response) => Ok(RemoteJobStatus {
                status: response.status,
                error_detail: response.error_detail,
            }),
            Err(e) if e.is_not_found() => Err(JobClientError::NotFoundRemote {
                external_job_id: external_job_id.to_string(),
            }),
            Err(e) => Err(JobClientError::Query {
                message: e.to_string(),
            }),
        }
    }
}

/// Map a REST failure at submission time onto [`JobClientError::Submission`].
///
/// A timeout is not retriable: the orchestration layer may already have
/// created the workbench job.
fn submission_error(err: &WorkbenchApiError) -> JobClientError {
    JobClientError::Submission {
        message: if err.is_timeout() {
            format!("Orchestration request timed out: {err}")
        } else {
            err.to_string()
        },
        retriable: err.is_transient() && !err.is_timeout(),
    }
}
