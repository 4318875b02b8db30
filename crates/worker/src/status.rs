//! `/health` and `/status` endpoints for the reconciliation worker.

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use batchrun_db::RunStore;
use batchrun_pipeline::CycleReport;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Shared state for the worker's status routes.
#[derive(Clone)]
pub struct WorkerState {
    pub store: Arc<dyn RunStore>,
    pub config: Arc<WorkerConfig>,
    /// Latest cycle report published by the reconciler.
    pub reports: watch::Receiver<Option<CycleReport>>,
    /// Cancelled once shutdown has begun.
    pub cancel: CancellationToken,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub poll_interval_secs: u64,
    pub max_concurrency: usize,
    pub orchestrator_url: String,
    pub workbench_url: String,
    /// `null` until the first cycle completes.
    pub last_cycle: Option<CycleReport>,
}

/// GET /health
async fn health_check(State(state): State<WorkerState>) -> Json<HealthResponse> {
    let db_healthy = state.store.health_check().await.is_ok();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// GET /status
async fn loop_status(State(state): State<WorkerState>) -> Json<StatusResponse> {
    let reconciler = &state.config.reconciler;
    let workbench = &state.config.workbench;

    Json(StatusResponse {
        running: !state.cancel.is_cancelled(),
        poll_interval_secs: reconciler.poll_interval.as_secs(),
        max_concurrency: reconciler.max_concurrency,
        orchestrator_url: workbench.orchestrator_url.clone(),
        workbench_url: workbench.workbench_url.clone(),
        last_cycle: state.reports.borrow().clone(),
    })
}

pub fn router(state: WorkerState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(loop_status))
        .with_state(state)
}
