//! Repository for the `pipelines` table.

use batchrun_core::types::DbId;
use sqlx::PgPool;

use crate::models::pipeline::PipelineRow;

/// Column list for `pipelines` queries.
const COLUMNS: &str = "id, workflow_name, mode, request_id, is_active, created_at, updated_at";

/// Read access to pipeline definitions.
pub struct PipelineRepo;

impl PipelineRepo {
    /// Find a pipeline by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PipelineRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pipelines WHERE id = $1");
        sqlx::query_as::<_, PipelineRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List pipelines ordered by ID, optionally including inactive ones.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<PipelineRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pipelines \
             WHERE is_active OR $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, PipelineRow>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }
}
