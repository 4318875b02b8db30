pub mod health;
pub mod pipeline_runs;
pub mod pipelines;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /pipeline-runs                 list, create (submits to orchestration)
/// /pipeline-runs/{id}            get
///
/// /pipelines                     list (?include_inactive=true)
/// /pipelines/{id}                get
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/pipeline-runs", pipeline_runs::router())
        .nest("/pipelines", pipelines::router())
}
