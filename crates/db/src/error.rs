use batchrun_core::error::CoreError;
use batchrun_core::status::RunStatus;
use batchrun_core::types::DbId;

/// Errors from the run store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A conditional update lost a race: the run is no longer in the
    /// expected status. Nothing was written.
    #[error("Pipeline run {id} is {actual}, expected {expected}")]
    StaleStatus {
        id: DbId,
        expected: RunStatus,
        actual: RunStatus,
    },

    /// A stored row could not be mapped onto the domain model.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn run_not_found(id: DbId) -> Self {
        StoreError::NotFound {
            entity: "PipelineRun",
            id,
        }
    }

    pub(crate) fn pipeline_not_found(id: DbId) -> Self {
        StoreError::NotFound {
            entity: "Pipeline",
            id,
        }
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            CoreError::Validation(msg) => StoreError::Validation(msg),
        }
    }
}
