//! Handlers for the `/pipeline-runs` resource.
//!
//! Creating a run submits it to orchestration in the same request; the
//! response reflects the run's state after submission.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use batchrun_core::run::NewRun;
use batchrun_core::status::parse_status_list;
use batchrun_core::types::DbId;
use batchrun_db::RunListQuery;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /pipeline-runs`.
#[derive(Debug, Default, Deserialize)]
pub struct RunListParams {
    /// Comma-separated status names, e.g. `RUNNING,SUBMITTED`.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl RunListParams {
    fn into_query(self) -> AppResult<RunListQuery> {
        let statuses = match self.status.as_deref() {
            Some(raw) => parse_status_list(raw)?,
            None => Vec::new(),
        };
        Ok(RunListQuery {
            statuses,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/pipeline-runs
///
/// Create a run and submit it. Returns 201 with the run in `SUBMITTED`.
/// If orchestration does not accept it the run is recorded as `FAILED`
/// and 502 is returned with the run in the body.
///
/// The submission runs on its own task so that a request timeout or a
/// client disconnect cannot leave the run in `CREATED`.
pub async fn create_run(
    State(state): State<AppState>,
    Json(input): Json<NewRun>,
) -> AppResult<impl IntoResponse> {
    let pipeline_id = input.pipeline_id;
    let submission = Arc::clone(&state.submission);
    let run = tokio::spawn(async move { submission.create_and_submit(input).await })
        .await
        .map_err(|e| AppError::Internal(format!("Submission task failed: {e}")))??;

    tracing::info!(
        run_id = run.id,
        pipeline_id,
        external_job_id = run.external_job_id.as_deref().unwrap_or_default(),
        "Pipeline run accepted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: run })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/pipeline-runs
///
/// List runs newest first. Supports `status`, `limit`, and `offset`.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<RunListParams>,
) -> AppResult<impl IntoResponse> {
    let query = params.into_query()?;
    let runs = state.store.list_runs(&query).await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /api/v1/pipeline-runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let run = state.store.get_run(run_id).await?;
    Ok(Json(DataResponse { data: run }))
}
