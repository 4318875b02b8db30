//! Row model for the `pipeline_runs` table.

use batchrun_core::run::Run;
use batchrun_core::status::{RunStatus, StatusId};
use batchrun_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    pub id: DbId,
    pub pipeline_id: DbId,
    pub status_id: StatusId,
    pub external_job_id: Option<String>,
    pub error_message: Option<String>,
    pub input_path_prefix: String,
    pub output_path_prefix: String,
    pub report_path_prefix: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<RunRow> for Run {
    type Error = StoreError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let status = RunStatus::from_id(row.status_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "pipeline run {} has unknown status_id {}",
                row.id, row.status_id
            ))
        })?;

        Ok(Run {
            id: row.id,
            pipeline_id: row.pipeline_id,
            status,
            external_job_id: row.external_job_id,
            error_message: row.error_message,
            input_path_prefix: row.input_path_prefix,
            output_path_prefix: row.output_path_prefix,
            report_path_prefix: row.report_path_prefix,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
