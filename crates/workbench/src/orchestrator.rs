//! REST client for the orchestration layer's batch submission endpoint.
//!
//! The orchestration layer runs a single-task workflow that calls the
//! workbench's submit endpoint and hands back the workbench job id.

use serde::{Deserialize, Serialize};

use crate::api::{parse_response, WorkbenchApiError};

/// HTTP client for the orchestration service.
pub struct OrchestratorApi {
    client: reqwest::Client,
    api_url: String,
}

/// Payload for `POST /execute-batch`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteBatchRequest<'a> {
    pub pipeline_run_id: i64,
    pub input_path_prefix: &'a str,
    pub output_path_prefix: &'a str,
    pub report_path_prefix: Option<&'a str>,
    pub workbench_api_url: &'a str,
    pub request_id: Option<&'a str>,
    pub workflow_name: &'a str,
    pub mode: &'a str,
}

/// Response from `POST /execute-batch`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteBatchResponse {
    #[serde(default, alias = "job_id")]
    pub workbench_job_id: Option<String>,
    #[serde(default = "default_submit_status")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_submit_status() -> String {
    "SUBMITTED".to_string()
}

impl OrchestratorApi {
    /// * `api_url` - Base HTTP URL, e.g. `http://batch-pipeline:8000`.
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a batch run for execution.
    pub async fn execute_batch(
        &self,
        request: &ExecuteBatchRequest<'_>,
    ) -> Result<ExecuteBatchResponse, WorkbenchApiError> {
        let response = self
            .client
            .post(format!("{}/execute-batch", self.api_url))
            .json(request)
            .send()
            .await?;

        parse_response(response).await
    }
}
