use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use batchrun_api::app::build_app;
use batchrun_api::config::ServerConfig;
use batchrun_api::state::AppState;
use batchrun_core::pipeline::{Pipeline, PipelineMode};
use batchrun_core::run::Run;
use batchrun_core::status::RunStatus;
use batchrun_db::{InMemoryRunStore, RunStore};
use batchrun_pipeline::{RetryPolicy, SubmissionConfig, SubmissionService, SystemClock};
use batchrun_workbench::{
    ExternalJobClient, JobClientError, RemoteJobStatus, SubmitJobRequest, SubmittedJob,
    WorkbenchConfig,
};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        workbench: WorkbenchConfig {
            orchestrator_url: "http://orchestrator.test".to_string(),
            workbench_url: "http://workbench.test".to_string(),
            request_timeout: Duration::from_secs(1),
        },
        submission: SubmissionConfig {
            submit_timeout: Duration::from_millis(200),
            retry: RetryPolicy::no_retry(),
        },
    }
}

/// Orchestration stand-in: hands out scripted results, then `wb-{run_id}`.
/// A result of `None` never answers.
#[derive(Default)]
pub struct ScriptedJobClient {
    results: Mutex<VecDeque<Option<Result<SubmittedJob, JobClientError>>>>,
    delay: Duration,
}

impl ScriptedJobClient {
    pub fn new(results: impl IntoIterator<Item = Option<Result<SubmittedJob, JobClientError>>>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            delay: Duration::ZERO,
        }
    }

    /// Answer every submission only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ExternalJobClient for ScriptedJobClient {
    async fn submit_job(&self, request: &SubmitJobRequest) -> Result<SubmittedJob, JobClientError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(Some(result)) => result,
            Some(None) => std::future::pending().await,
            None => Ok(SubmittedJob {
                external_job_id: format!("wb-{}", request.run_id),
                status: "queued".to_string(),
            }),
        }
    }

    async fn get_job_status(&self, external_job_id: &str) -> Result<RemoteJobStatus, JobClientError> {
        Err(JobClientError::NotFoundRemote {
            external_job_id: external_job_id.to_string(),
        })
    }
}

pub fn pipeline(id: i64, mode: PipelineMode, is_active: bool) -> Pipeline {
    Pipeline {
        id,
        workflow_name: "batch_pipeline_workflow".to_string(),
        mode,
        request_id: Some(format!("req-{id}")),
        is_active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// In-memory store with pipeline 7 (active batch), 8 (realtime) and
/// 9 (inactive batch).
pub async fn seeded_store() -> Arc<InMemoryRunStore> {
    let store = InMemoryRunStore::new();
    store.add_pipeline(pipeline(7, PipelineMode::Batch, true)).await;
    store.add_pipeline(pipeline(8, PipelineMode::Realtime, true)).await;
    store.add_pipeline(pipeline(9, PipelineMode::Batch, false)).await;
    Arc::new(store)
}

/// Build the full application router over the given store and job client.
pub fn build_test_app(store: Arc<dyn RunStore>, client: Arc<dyn ExternalJobClient>) -> Router {
    build_test_app_with_config(store, client, test_config())
}

pub fn build_test_app_with_config(
    store: Arc<dyn RunStore>,
    client: Arc<dyn ExternalJobClient>,
    config: ServerConfig,
) -> Router {
    let submission = SubmissionService::new(
        Arc::clone(&store),
        client,
        Arc::new(SystemClock),
        config.submission.clone(),
    );

    build_app(AppState {
        store,
        submission: Arc::new(submission),
        config: Arc::new(config),
    })
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(json_request(Method::POST, uri, body)).await.unwrap()
}

/// Poll the store until the only run reaches `status`, for up to 5s.
pub async fn wait_for_only_run(store: &dyn RunStore, status: RunStatus) -> Run {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let runs = store.list_runs(&Default::default()).await.unwrap();
        assert!(runs.len() <= 1, "expected at most one run, got {}", runs.len());
        if let Some(run) = runs.into_iter().find(|r| r.status == status) {
            return run;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "run never reached {status:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
