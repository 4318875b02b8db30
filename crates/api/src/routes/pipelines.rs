//! Route definitions for the `/pipelines` resource (read-only catalog).

use axum::routing::get;
use axum::Router;

use crate::handlers::pipelines;
use crate::state::AppState;

/// Routes mounted at `/pipelines`.
///
/// ```text
/// GET    /        -> list_pipelines
/// GET    /{id}    -> get_pipeline
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pipelines::list_pipelines))
        .route("/{id}", get(pipelines::get_pipeline))
}
