//! In-memory [`RunStore`] with the same semantics as the PostgreSQL store.
//!
//! Each run lives behind its own async mutex. The map lock is only held long
//! enough to look up or insert a record, so updates to different runs never
//! wait on each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use batchrun_core::pipeline::Pipeline;
use batchrun_core::run::{NewRun, Run};
use batchrun_core::status::RunStatus;
use batchrun_core::types::DbId;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::store::{RunListQuery, RunStore, RunUpdate};

#[derive(Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<DbId, Arc<Mutex<Run>>>>,
    pipelines: RwLock<HashMap<DbId, Pipeline>>,
    next_id: AtomicI64,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline definition.
    pub async fn add_pipeline(&self, pipeline: Pipeline) {
        self.pipelines.write().await.insert(pipeline.id, pipeline);
    }

    /// Insert a run as-is, in whatever state it carries. Later IDs handed out
    /// by [`RunStore::create_run`] stay above every inserted ID.
    pub async fn insert_run(&self, run: Run) {
        self.next_id.fetch_max(run.id, Ordering::SeqCst);
        self.runs
            .write()
            .await
            .insert(run.id, Arc::new(Mutex::new(run)));
    }

    async fn record(&self, id: DbId) -> Result<Arc<Mutex<Run>>, StoreError> {
        self.runs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::run_not_found(id))
    }

    /// Clone every stored run. Record locks are taken one at a time.
    async fn snapshot(&self) -> Vec<Run> {
        let records: Vec<Arc<Mutex<Run>>> = self.runs.read().await.values().cloned().collect();
        let mut runs = Vec::with_capacity(records.len());
        for record in records {
            runs.push(record.lock().await.clone());
        }
        runs
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create_run(&self, input: &NewRun) -> Result<Run, StoreError> {
        input.validate()?;
        if !self.pipelines.read().await.contains_key(&input.pipeline_id) {
            return Err(StoreError::pipeline_not_found(input.pipeline_id));
        }

        let now = Utc::now();
        let run = Run {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            pipeline_id: input.pipeline_id,
            status: RunStatus::Created,
            external_job_id: None,
            error_message: None,
            input_path_prefix: input.input_path_prefix.clone(),
            output_path_prefix: input.output_path_prefix.clone(),
            report_path_prefix: input.report_path_prefix.clone(),
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.runs
            .write()
            .await
            .insert(run.id, Arc::new(Mutex::new(run.clone())));
        Ok(run)
    }

    async fn get_run(&self, id: DbId) -> Result<Run, StoreError> {
        let record = self.record(id).await?;
        let run = record.lock().await.clone();
        Ok(run)
    }

    async fn list_active_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|r| r.status.is_active())
            .collect();
        runs.sort_by_key(|r| r.id);
        Ok(runs)
    }

    async fn update_run_status(&self, id: DbId, update: &RunUpdate) -> Result<Run, StoreError> {
        let record = self.record(id).await?;
        let mut current = record.lock().await;

        if current.status != update.expected {
            return Err(StoreError::StaleStatus {
                id,
                expected: update.expected,
                actual: current.status,
            });
        }

        let mut next = current.clone();
        next.status = update.status;
        if next.external_job_id.is_none() {
            next.external_job_id = update.external_job_id.clone();
        }
        next.error_message = update.error_message.clone();
        if next.started_at.is_none() {
            next.started_at = update.started_at;
        }
        next.completed_at = update.completed_at;
        next.updated_at = Utc::now();

        // Mirrors the table CHECK constraints.
        if let Some(violation) = next.invariant_violation() {
            return Err(StoreError::Validation(format!(
                "update of pipeline run {id} to {}: {violation}",
                update.status
            )));
        }

        *current = next.clone();
        Ok(next)
    }

    async fn list_runs(&self, query: &RunListQuery) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|r| query.statuses.is_empty() || query.statuses.contains(&r.status))
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(runs
            .into_iter()
            .skip(query.effective_offset() as usize)
            .take(query.effective_limit() as usize)
            .collect())
    }

    async fn get_pipeline(&self, id: DbId) -> Result<Pipeline, StoreError> {
        self.pipelines
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::pipeline_not_found(id))
    }

    async fn list_pipelines(&self, include_inactive: bool) -> Result<Vec<Pipeline>, StoreError> {
        let mut pipelines: Vec<Pipeline> = self
            .pipelines
            .read()
            .await
            .values()
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect();
        pipelines.sort_by_key(|p| p.id);
        Ok(pipelines)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
