//! PostgreSQL-backed [`RunStore`].

use async_trait::async_trait;
use batchrun_core::pipeline::Pipeline;
use batchrun_core::run::{NewRun, Run};
use batchrun_core::types::DbId;

use crate::error::StoreError;
use crate::repositories::{PipelineRepo, RunRepo};
use crate::store::{RunListQuery, RunStore, RunUpdate};
use crate::DbPool;

/// PostgreSQL foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL check constraint violation.
const CHECK_VIOLATION: &str = "23514";

/// Run store over a PostgreSQL pool.
///
/// Updates are single conditional `UPDATE` statements, so each one is atomic
/// per row and takes no lock beyond the row itself.
#[derive(Clone)]
pub struct PgRunStore {
    pool: DbPool,
}

impl PgRunStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create_run(&self, input: &NewRun) -> Result<Run, StoreError> {
        input.validate()?;

        let row = RunRepo::create(&self.pool, input).await.map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                    return StoreError::pipeline_not_found(input.pipeline_id);
                }
            }
            StoreError::Database(e)
        })?;

        let run = Run::try_from(row)?;
        tracing::debug!(run_id = run.id, pipeline_id = run.pipeline_id, "Pipeline run created");
        Ok(run)
    }

    async fn get_run(&self, id: DbId) -> Result<Run, StoreError> {
        RunRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::run_not_found(id))?
            .try_into()
    }

    async fn list_active_runs(&self) -> Result<Vec<Run>, StoreError> {
        RunRepo::list_active(&self.pool)
            .await?
            .into_iter()
            .map(Run::try_from)
            .collect()
    }

    async fn update_run_status(&self, id: DbId, update: &RunUpdate) -> Result<Run, StoreError> {
        let updated = RunRepo::update_status(&self.pool, id, update)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some(CHECK_VIOLATION) {
                        return StoreError::Validation(format!(
                            "update of pipeline run {id} to {} violates {}",
                            update.status,
                            db_err.constraint().unwrap_or("a check constraint"),
                        ));
                    }
                }
                StoreError::Database(e)
            })?;

        match updated {
            Some(row) => Run::try_from(row),
            None => {
                // Distinguish an unknown ID from a lost compare-and-set.
                let current = self.get_run(id).await?;
                Err(StoreError::StaleStatus {
                    id,
                    expected: update.expected,
                    actual: current.status,
                })
            }
        }
    }

    async fn list_runs(&self, query: &RunListQuery) -> Result<Vec<Run>, StoreError> {
        RunRepo::list(&self.pool, query)
            .await?
            .into_iter()
            .map(Run::try_from)
            .collect()
    }

    async fn get_pipeline(&self, id: DbId) -> Result<Pipeline, StoreError> {
        PipelineRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::pipeline_not_found(id))?
            .try_into()
    }

    async fn list_pipelines(&self, include_inactive: bool) -> Result<Vec<Pipeline>, StoreError> {
        PipelineRepo::list(&self.pool, include_inactive)
            .await?
            .into_iter()
            .map(Pipeline::try_from)
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
