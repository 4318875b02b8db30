//! Row model for the `pipelines` table.

use batchrun_core::pipeline::Pipeline;
use batchrun_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from the `pipelines` table.
#[derive(Debug, Clone, FromRow)]
pub struct PipelineRow {
    pub id: DbId,
    pub workflow_name: String,
    pub mode: String,
    pub request_id: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = StoreError;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        let mode = row.mode.parse().map_err(|_| {
            StoreError::Corrupt(format!("pipeline {} has unknown mode '{}'", row.id, row.mode))
        })?;

        Ok(Pipeline {
            id: row.id,
            workflow_name: row.workflow_name,
            mode,
            request_id: row.request_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
