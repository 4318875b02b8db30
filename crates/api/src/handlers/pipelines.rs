//! Handlers for the `/pipelines` resource.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use batchrun_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /pipelines`.
#[derive(Debug, Default, Deserialize)]
pub struct PipelineListParams {
    /// Include deactivated pipelines (default: `false`).
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/v1/pipelines
///
/// List pipeline definitions, active ones only unless asked otherwise.
pub async fn list_pipelines(
    State(state): State<AppState>,
    Query(params): Query<PipelineListParams>,
) -> AppResult<impl IntoResponse> {
    let pipelines = state.store.list_pipelines(params.include_inactive).await?;
    Ok(Json(DataResponse { data: pipelines }))
}

/// GET /api/v1/pipelines/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let pipeline = state.store.get_pipeline(pipeline_id).await?;
    Ok(Json(DataResponse { data: pipeline }))
}
