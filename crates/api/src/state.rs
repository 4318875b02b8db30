use std::sync::Arc;

use batchrun_db::RunStore;
use batchrun_pipeline::SubmissionService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Run store (PostgreSQL in production, in-memory in tests).
    pub store: Arc<dyn RunStore>,
    /// Creates runs and submits them to orchestration.
    pub submission: Arc<SubmissionService>,
    pub config: Arc<ServerConfig>,
}
