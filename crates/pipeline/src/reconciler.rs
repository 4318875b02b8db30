//! Background reconciliation of active runs against the workbench.
//!
//! Every `poll_interval` the reconciler takes a snapshot of the runs in
//! `SUBMITTED` or `RUNNING`, asks the workbench for each job's status and
//! applies the resulting lifecycle transition. Runs are handled
//! independently: one run's failure never affects another, and nothing
//! short of cancellation stops the loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use batchrun_core::lifecycle::{self, Rejection, RunEvent};
use batchrun_core::remote_status::RemoteStatus;
use batchrun_core::run::Run;
use batchrun_core::types::Timestamp;
use batchrun_db::{RunStore, RunUpdate, StoreError};
use batchrun_workbench::{ExternalJobClient, JobClientError};
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::ReconcilerConfig;
use crate::effects::report_effects;
use crate::retry::{retry_with_backoff, RetryOutcome};

/// Errors that abort a whole cycle. Per-run failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Failed to load active runs: {0}")]
    Store(#[from] StoreError),

    #[error("Reconciliation cycle panicked: {0}")]
    Panicked(String),
}

/// Tally of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: Timestamp,
    pub duration_ms: u64,
    /// Active runs in the snapshot.
    pub examined: usize,
    /// Runs whose status changed.
    pub transitioned: usize,
    /// Runs the workbench reported without a change to apply.
    pub unchanged: usize,
    /// Runs whose status query failed transiently. Retried next cycle.
    pub deferred: usize,
    /// Runs skipped as inconsistent (no external job id).
    pub skipped: usize,
    /// Runs whose update could not be stored.
    pub failed: usize,
}

impl CycleReport {
    fn new(started_at: Timestamp, examined: usize) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            examined,
            transitioned: 0,
            unchanged: 0,
            deferred: 0,
            skipped: 0,
            failed: 0,
        }
    }

    fn record(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Transitioned => self.transitioned += 1,
            RunOutcome::Unchanged => self.unchanged += 1,
            RunOutcome::Deferred => self.deferred += 1,
            RunOutcome::Skipped => self.skipped += 1,
            RunOutcome::Failed => self.failed += 1,
        }
    }
}

/// What happened to a single run within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Transitioned,
    Unchanged,
    Deferred,
    Skipped,
    Failed,
}

/// The reconciliation engine.
///
/// A single long-lived task drives [`Reconciler::run`]; within a cycle up
/// to `max_concurrency` runs are reconciled at once.
pub struct Reconciler {
    store: Arc<dyn RunStore>,
    client: Arc<dyn ExternalJobClient>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
    reports: watch::Sender<Option<CycleReport>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RunStore>,
        client: Arc<dyn ExternalJobClient>,
        clock: Arc<dyn Clock>,
        config: ReconcilerConfig,
    ) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            store,
            client,
            clock,
            config,
            reports,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Receiver for the report of the most recent successful cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<CycleReport>> {
        self.reports.subscribe()
    }

    /// Run the reconciliation loop until the cancellation token is
    /// triggered.
    ///
    /// A cycle that has started always runs to completion; cancellation is
    /// only observed between cycles.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_concurrency = self.config.max_concurrency,
            "Reconciler started",
        );

        while !cancel.is_cancelled() {
            let pause = match self.guarded_cycle().await {
                Ok(report) => {
                    tracing::info!(
                        examined = report.examined,
                        transitioned = report.transitioned,
                        unchanged = report.unchanged,
                        deferred = report.deferred,
                        skipped = report.skipped,
                        failed = report.failed,
                        duration_ms = report.duration_ms,
                        "Reconciliation cycle finished",
                    );
                    self.reports.send_replace(Some(report));
                    self.config.poll_interval
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        cooldown_ms = self.config.error_cooldown.as_millis() as u64,
                        "Reconciliation cycle failed",
                    );
                    self.config.error_cooldown
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = self.clock.sleep(pause) => {}
            }
        }

        tracing::info!("Reconciler shutting down");
    }

    /// [`Reconciler::run_cycle`] with panics turned into
    /// [`CycleError::Panicked`].
    async fn guarded_cycle(&self) -> Result<CycleReport, CycleError> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(CycleError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    /// One reconciliation cycle over the current active set.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let timer = Instant::now();
        let runs = self.store.list_active_runs().await?;
        let mut report = CycleReport::new(self.clock.now(), runs.len());

        if runs.is_empty() {
            tracing::debug!("No active pipeline runs");
        }

        let outcomes: Vec<RunOutcome> = futures::stream::iter(runs)
            .map(|run| self.reconcile_isolated(run))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }
        report.duration_ms = timer.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Reconcile one run, containing any panic to that run.
    async fn reconcile_isolated(&self, run: Run) -> RunOutcome {
        let run_id = run.id;
        match AssertUnwindSafe(self.reconcile_run(run)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                tracing::error!(
                    run_id,
                    panic = %panic_message(payload.as_ref()),
                    "Reconciling pipeline run panicked",
                );
                RunOutcome::Failed
            }
        }
    }

    async fn reconcile_run(&self, run: Run) -> RunOutcome {
        let Some(job_id) = run.external_job_id.clone() else {
            tracing::warn!(
                run_id = run.id,
                status = %run.status,
                "Active pipeline run has no external job id; skipping",
            );
            return RunOutcome::Skipped;
        };

        let outcome = retry_with_backoff(
            &self.config.retry,
            self.clock.as_ref(),
            |_| self.client.get_job_status(&job_id),
            JobClientError::is_retriable,
        )
        .await;

        let event = match outcome {
            RetryOutcome::Succeeded { value, .. } => RunEvent::RemoteReported {
                status: RemoteStatus::parse(&value.status),
                error_detail: value.error_detail,
            },
            RetryOutcome::Aborted {
                error: JobClientError::NotFoundRemote { external_job_id },
                ..
            } => RunEvent::RemoteLost {
                message: format!("Workbench has no record of job {external_job_id}"),
            },
            RetryOutcome::Aborted { error, attempts } | RetryOutcome::Exhausted { error, attempts } => {
                tracing::warn!(
                    run_id = run.id,
                    external_job_id = %job_id,
                    attempts,
                    error = %error,
                    "Status query failed; will retry next cycle",
                );
                return RunOutcome::Deferred;
            }
        };

        let transition = match lifecycle::transition(&run, &event, self.clock.now()) {
            Ok(t) => t,
            Err(Rejection::UnknownRemoteStatus { raw }) => {
                tracing::warn!(
                    run_id = run.id,
                    external_job_id = %job_id,
                    remote_status = %raw,
                    "Unrecognised workbench status; leaving run unchanged",
                );
                return RunOutcome::Unchanged;
            }
            Err(rejection) => {
                tracing::debug!(run_id = run.id, reason = %rejection, "No transition");
                return RunOutcome::Unchanged;
            }
        };

        match self
            .store
            .update_run_status(run.id, &RunUpdate::from(&transition))
            .await
        {
            Ok(updated) => {
                tracing::info!(
                    run_id = updated.id,
                    from = %transition.from,
                    to = %updated.status,
                    "Pipeline run status updated",
                );
                report_effects(updated.id, &transition.effects);
                RunOutcome::Transitioned
            }
            Err(StoreError::StaleStatus { actual, .. }) => {
                tracing::debug!(
                    run_id = run.id,
                    status = %actual,
                    "Pipeline run changed concurrently; skipping",
                );
                RunOutcome::Unchanged
            }
            Err(e) => {
                tracing::error!(
                    run_id = run.id,
                    to = %transition.to(),
                    error = %e,
                    "Failed to store pipeline run transition",
                );
                RunOutcome::Failed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
