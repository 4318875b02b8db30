use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use batchrun_core::pipeline::{Pipeline, PipelineMode};
use batchrun_core::run::{NewRun, Run};
use batchrun_core::status::RunStatus;
use batchrun_core::types::{DbId, Timestamp};
use batchrun_db::{InMemoryRunStore, RunListQuery, RunStore, RunUpdate, StoreError};
use batchrun_pipeline::{Clock, ReconcilerConfig, RetryPolicy, SubmissionConfig};
use batchrun_workbench::{
    ExternalJobClient, JobClientError, RemoteJobStatus, SubmitJobRequest, SubmittedJob,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Clock that records requested sleeps and returns immediately. Optionally
/// cancels a token once a given number of sleeps has been requested.
#[derive(Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(sleeps: usize, cancel: CancellationToken) -> Self {
        Self {
            sleeps: Mutex::default(),
            cancel_after: Some((sleeps, cancel)),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        if let Some((limit, cancel)) = &self.cancel_after {
            if count >= *limit {
                cancel.cancel();
            }
        }
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Job client
// ---------------------------------------------------------------------------

/// Scripted [`ExternalJobClient`].
///
/// Submissions pop results in order and fall back to `wb-{run_id}`. Status
/// queries pop per-job results; the last scripted result repeats. Jobs with
/// no script are unknown to the workbench.
#[derive(Default)]
pub struct FakeJobClient {
    submit_results: Mutex<VecDeque<Result<SubmittedJob, JobClientError>>>,
    submit_delay: Option<Duration>,
    statuses: Mutex<HashMap<String, VecDeque<Result<RemoteJobStatus, JobClientError>>>>,
    status_delay: Option<Duration>,
    panic_on: Option<String>,
    submit_calls: Mutex<Vec<SubmitJobRequest>>,
    status_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeJobClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_submit_results(
        self,
        results: impl IntoIterator<Item = Result<SubmittedJob, JobClientError>>,
    ) -> Self {
        *self.submit_results.lock().unwrap() = results.into_iter().collect();
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn panicking_on(mut self, external_job_id: &str) -> Self {
        self.panic_on = Some(external_job_id.to_string());
        self
    }

    /// Script the reported statuses for a job, in order.
    pub fn with_statuses(self, external_job_id: &str, statuses: &[&str]) -> Self {
        let script = statuses.iter().map(|s| Ok(remote(s))).collect();
        self.statuses
            .lock()
            .unwrap()
            .insert(external_job_id.to_string(), script);
        self
    }

    pub fn with_status_results(
        self,
        external_job_id: &str,
        results: impl IntoIterator<Item = Result<RemoteJobStatus, JobClientError>>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(external_job_id.to_string(), results.into_iter().collect());
        self
    }

    pub fn submit_calls(&self) -> Vec<SubmitJobRequest> {
        self.submit_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalJobClient for FakeJobClient {
    async fn submit_job(&self, request: &SubmitJobRequest) -> Result<SubmittedJob, JobClientError> {
        self.submit_calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.submit_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SubmittedJob {
                external_job_id: format!("wb-{}", request.run_id),
                status: "queued".to_string(),
            })
        })
    }

    async fn get_job_status(&self, external_job_id: &str) -> Result<RemoteJobStatus, JobClientError> {
        self.status_calls
            .lock()
            .unwrap()
            .push(external_job_id.to_string());
        if self.panic_on.as_deref() == Some(external_job_id) {
            panic!("scripted panic for {external_job_id}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut statuses = self.statuses.lock().unwrap();
        match statuses.get_mut(external_job_id) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) if !script.is_empty() => script[0].clone(),
            _ => Err(JobClientError::NotFoundRemote {
                external_job_id: external_job_id.to_string(),
            }),
        }
    }
}

pub fn remote(status: &str) -> RemoteJobStatus {
    RemoteJobStatus {
        status: status.to_string(),
        error_detail: None,
    }
}

pub fn query_error() -> JobClientError {
    JobClientError::Query {
        message: "connection reset".to_string(),
    }
}

pub fn submitted(job_id: &str) -> SubmittedJob {
    SubmittedJob {
        external_job_id: job_id.to_string(),
        status: "queued".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`InMemoryRunStore`] with injectable failures.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryRunStore,
    fail_listing: AtomicBool,
    fail_all_updates: AtomicBool,
    fail_updates_for: Mutex<HashSet<DbId>>,
    fail_next_updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryRunStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn fail_all_updates(&self) {
        self.fail_all_updates.store(true, Ordering::SeqCst);
    }

    pub fn fail_updates_for(&self, id: DbId) {
        self.fail_updates_for.lock().unwrap().insert(id);
    }

    /// Fail the next `n` updates, then recover.
    pub fn fail_next_updates(&self, n: usize) {
        self.fail_next_updates.store(n, Ordering::SeqCst);
    }
}

fn injected() -> StoreError {
    StoreError::Corrupt("injected failure".to_string())
}

#[async_trait]
impl RunStore for FlakyStore {
    async fn create_run(&self, input: &NewRun) -> Result<Run, StoreError> {
        self.inner.create_run(input).await
    }

    async fn get_run(&self, id: DbId) -> Result<Run, StoreError> {
        self.inner.get_run(id).await
    }

    async fn list_active_runs(&self) -> Result<Vec<Run>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.list_active_runs().await
    }

    async fn update_run_status(&self, id: DbId, update: &RunUpdate) -> Result<Run, StoreError> {
        let fail_next = self
            .fail_next_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail_next
            || self.fail_all_updates.load(Ordering::SeqCst)
            || self.fail_updates_for.lock().unwrap().contains(&id)
        {
            return Err(injected());
        }
        self.inner.update_run_status(id, update).await
    }

    async fn list_runs(&self, query: &RunListQuery) -> Result<Vec<Run>, StoreError> {
        self.inner.list_runs(query).await
    }

    async fn get_pipeline(&self, id: DbId) -> Result<Pipeline, StoreError> {
        self.inner.get_pipeline(id).await
    }

    async fn list_pipelines(&self, include_inactive: bool) -> Result<Vec<Pipeline>, StoreError> {
        self.inner.list_pipelines(include_inactive).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn pipeline(id: DbId, mode: PipelineMode, is_active: bool) -> Pipeline {
    Pipeline {
        id,
        workflow_name: "batch_pipeline_workflow".to_string(),
        mode,
        request_id: Some(format!("req-{id}")),
        is_active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A run already handed to the workbench.
pub fn active_run(id: DbId, status: RunStatus, external_job_id: Option<&str>) -> Run {
    let created = Utc::now() - chrono::Duration::minutes(10);
    Run {
        id,
        pipeline_id: 7,
        status,
        external_job_id: external_job_id.map(str::to_string),
        error_message: None,
        input_path_prefix: format!("/in/{id}"),
        output_path_prefix: format!("/out/{id}"),
        report_path_prefix: None,
        started_at: Some(created),
        completed_at: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn new_run(pipeline_id: DbId) -> NewRun {
    NewRun {
        pipeline_id,
        input_path_prefix: "/in/7".to_string(),
        output_path_prefix: "/out/7".to_string(),
        report_path_prefix: Some("/rep/7".to_string()),
    }
}

/// In-memory store with pipeline 7 (active batch), 8 (realtime) and
/// 9 (inactive batch).
pub async fn seeded_store() -> InMemoryRunStore {
    let store = InMemoryRunStore::new();
    store.add_pipeline(pipeline(7, PipelineMode::Batch, true)).await;
    store.add_pipeline(pipeline(8, PipelineMode::Realtime, true)).await;
    store.add_pipeline(pipeline(9, PipelineMode::Batch, false)).await;
    store
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        multiplier: 2.0,
    }
}

pub fn reconciler_config() -> ReconcilerConfig {
    ReconcilerConfig {
        poll_interval: Duration::from_secs(30),
        error_cooldown: Duration::from_secs(5),
        max_concurrency: 4,
        retry: fast_retry(),
    }
}

pub fn submission_config() -> SubmissionConfig {
    SubmissionConfig {
        submit_timeout: Duration::from_secs(5),
        retry: fast_retry(),
    }
}
