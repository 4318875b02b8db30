//! Route definitions for the `/pipeline-runs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::pipeline_runs;
use crate::state::AppState;

/// Routes mounted at `/pipeline-runs`.
///
/// ```text
/// GET    /        -> list_runs
/// POST   /        -> create_run
/// GET    /{id}    -> get_run
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pipeline_runs::list_runs).post(pipeline_runs::create_run))
        .route("/{id}", get(pipeline_runs::get_run))
}
