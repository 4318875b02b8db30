//! Repository for the `pipeline_runs` table.
//!
//! Status values are bound through `RunStatus::id()`; no magic numbers in
//! queries apart from the seed-aligned CHECK constraints in the migration.

use batchrun_core::run::NewRun;
use batchrun_core::status::{RunStatus, StatusId, ACTIVE_STATUSES};
use batchrun_core::types::DbId;
use sqlx::PgPool;

use crate::models::run::RunRow;
use crate::store::{RunListQuery, RunUpdate};

/// Column list for `pipeline_runs` queries.
const COLUMNS: &str = "\
    id, pipeline_id, status_id, external_job_id, error_message, \
    input_path_prefix, output_path_prefix, report_path_prefix, \
    started_at, completed_at, created_at, updated_at";

/// Provides CRUD operations for pipeline runs.
pub struct RunRepo;

impl RunRepo {
    /// Insert a new run in `CREATED` state.
    pub async fn create(pool: &PgPool, input: &NewRun) -> Result<RunRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO pipeline_runs \
                 (pipeline_id, status_id, input_path_prefix, output_path_prefix, report_path_prefix) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(input.pipeline_id)
            .bind(RunStatus::Created.id())
            .bind(&input.input_path_prefix)
            .bind(&input.output_path_prefix)
            .bind(&input.report_path_prefix)
            .fetch_one(pool)
            .await
    }

    /// Find a run by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pipeline_runs WHERE id = $1");
        sqlx::query_as::<_, RunRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All runs in an active status, oldest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<RunRow>, sqlx::Error> {
        let active: Vec<StatusId> = ACTIVE_STATUSES.iter().map(|s| s.id()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_runs \
             WHERE status_id = ANY($1) \
             ORDER BY id"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(active)
            .fetch_all(pool)
            .await
    }

    /// Conditionally apply a status transition.
    ///
    /// Only updates the row while its `status_id` still equals
    /// `update.expected`. Returns `None` when no row matched (unknown ID or
    /// a concurrent writer got there first). `external_job_id` and
    /// `started_at` keep any value already stored.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        update: &RunUpdate,
    ) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!(
            "UPDATE pipeline_runs \
             SET status_id = $3, \
                 external_job_id = COALESCE(external_job_id, $4), \
                 error_message = $5, \
                 started_at = COALESCE(started_at, $6), \
                 completed_at = $7, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(id)
            .bind(update.expected.id())
            .bind(update.status.id())
            .bind(&update.external_job_id)
            .bind(&update.error_message)
            .bind(update.started_at)
            .bind(update.completed_at)
            .fetch_optional(pool)
            .await
    }

    /// List runs newest first with optional status filter and pagination.
    pub async fn list(pool: &PgPool, params: &RunListQuery) -> Result<Vec<RunRow>, sqlx::Error> {
        let limit = params.effective_limit();
        let offset = params.effective_offset();

        // Build the WHERE clause and track the next bind parameter index.
        let mut bind_idx: u32 = 1;
        let where_clause = if params.statuses.is_empty() {
            String::new()
        } else {
            bind_idx += 1;
            "WHERE status_id = ANY($1)".to_string()
        };

        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_runs \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, RunRow>(&query);
        if !params.statuses.is_empty() {
            let ids: Vec<StatusId> = params.statuses.iter().map(|s| s.id()).collect();
            q = q.bind(ids);
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
