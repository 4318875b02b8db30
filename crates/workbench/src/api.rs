//! REST API client for the workbench job status endpoint.
//!
//! Wraps `GET /jobs/{id}/status` using [`reqwest`], plus the response
//! helpers shared with the orchestration client.

use serde::Deserialize;

/// HTTP client for the workbench API.
pub struct WorkbenchApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by the workbench status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    /// Free-form status string, e.g. `RUNNING` or `succeeded`.
    pub status: String,
    /// Failure detail, if the workbench supplied one.
    #[serde(default, alias = "error_message")]
    pub error_detail: Option<String>,
}

/// Errors from the workbench and orchestration REST layers.
#[derive(Debug, thiserror::Error)]
pub enum WorkbenchApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote service returned a non-2xx status code.
    #[error("Remote API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The configured base URL cannot carry a job path.
    #[error("Invalid workbench URL: {0}")]
    InvalidUrl(String),
}

impl WorkbenchApiError {
    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Transport failures, timeouts, 408, 429 and 5xx are transient. Other
    /// 4xx responses and undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkbenchApiError::Request(e) => !e.is_decode() && !e.is_builder(),
            WorkbenchApiError::ApiError { status, .. } => is_transient_status(*status),
            WorkbenchApiError::InvalidUrl(_) => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkbenchApiError::Request(e) if e.is_timeout())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkbenchApiError::ApiError { status: 404, .. })
    }
}

/// HTTP status codes worth retrying.
pub fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

impl WorkbenchApi {
    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (which carries the per-request timeout).
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://workbench-api:8080`.
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Query the status of a workbench job.
    ///
    /// Sends `GET /jobs/{job_id}/status`.
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatusResponse, WorkbenchApiError> {
        let response = self.client.get(self.job_status_url(job_id)?).send().await?;

        parse_response(response).await
    }

    /// `{api_url}/jobs/{job_id}/status` with `job_id` as a single
    /// percent-encoded path segment.
    fn job_status_url(&self, job_id: &str) -> Result<reqwest::Url, WorkbenchApiError> {
        let mut url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| WorkbenchApiError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| WorkbenchApiError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(["jobs", job_id, "status"]);
        Ok(url)
    }
}

// ---- response helpers ----

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`WorkbenchApiError::ApiError`] containing the
/// status and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, WorkbenchApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(WorkbenchApiError::ApiError {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, WorkbenchApiError> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}
