//! The run store contract.

use async_trait::async_trait;
use batchrun_core::lifecycle::Transition;
use batchrun_core::pipeline::Pipeline;
use batchrun_core::run::{NewRun, Run};
use batchrun_core::status::RunStatus;
use batchrun_core::types::{DbId, Timestamp};

use crate::error::StoreError;

/// Maximum page size for run listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for run listing.
pub const DEFAULT_LIMIT: i64 = 50;

/// A status transition plus its field updates, applied atomically.
///
/// The write only happens while the stored status still equals `expected`.
/// `external_job_id` and `started_at` are write-once: an already-set value
/// is never overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct RunUpdate {
    pub expected: RunStatus,
    pub status: RunStatus,
    pub external_job_id: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl From<&Transition> for RunUpdate {
    fn from(t: &Transition) -> Self {
        Self {
            expected: t.from,
            status: t.run.status,
            external_job_id: t.run.external_job_id.clone(),
            error_message: t.run.error_message.clone(),
            started_at: t.run.started_at,
            completed_at: t.run.completed_at,
        }
    }
}

/// Filter and pagination for run listing.
#[derive(Debug, Clone, Default)]
pub struct RunListQuery {
    /// Only return runs in one of these statuses. Empty means all.
    pub statuses: Vec<RunStatus>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl RunListQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Persistent table of pipeline runs.
///
/// Every mutation goes through [`RunStore::update_run_status`], which is
/// atomic per record. Implementations must allow concurrent updates on
/// different runs without a global lock.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a new run in `CREATED` state.
    async fn create_run(&self, input: &NewRun) -> Result<Run, StoreError>;

    async fn get_run(&self, id: DbId) -> Result<Run, StoreError>;

    /// Snapshot of all runs in `SUBMITTED` or `RUNNING`, ordered by id.
    async fn list_active_runs(&self) -> Result<Vec<Run>, StoreError>;

    /// Apply a status transition. Fails with [`StoreError::StaleStatus`] if
    /// the stored status no longer matches `update.expected`.
    async fn update_run_status(&self, id: DbId, update: &RunUpdate) -> Result<Run, StoreError>;

    /// List runs newest first, optionally filtered by status.
    async fn list_runs(&self, query: &RunListQuery) -> Result<Vec<Run>, StoreError>;

    async fn get_pipeline(&self, id: DbId) -> Result<Pipeline, StoreError>;

    /// List pipelines ordered by id. Inactive ones only when asked for.
    async fn list_pipelines(&self, include_inactive: bool) -> Result<Vec<Pipeline>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
