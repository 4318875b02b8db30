use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use batchrun_core::error::CoreError;
use batchrun_core::run::Run;
use batchrun_db::StoreError;
use batchrun_pipeline::SubmissionError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps domain, store and submission errors.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `batchrun_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A run store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The run was created but orchestration did not accept it. The body
    /// carries the run as recorded so callers can see its final state.
    #[error("Submission failed: {message}")]
    SubmissionFailed { run: Box<Run>, message: String },

    /// An unexpected server-side failure. The message is logged, not returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Store(e) => AppError::Store(e),
            SubmissionError::Failed { run, message } => AppError::SubmissionFailed { run, message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            AppError::SubmissionFailed { message, .. } => {
                (StatusCode::BAD_GATEWAY, "SUBMISSION_FAILED", message.clone())
            }

            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let AppError::SubmissionFailed { run, .. } = &self {
            body["data"] = json!(run);
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - `NotFound` maps to 404, `Validation` to 400.
/// - `StaleStatus` (a concurrent status change) maps to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        StoreError::StaleStatus { .. } => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
        StoreError::Corrupt(_) | StoreError::Database(_) => {
            tracing::error!(error = %err, "Store error");
            internal()
        }
    }
}
