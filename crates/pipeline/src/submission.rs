//! Submission flow: create a run, hand it to orchestration, and record the
//! outcome.
//!
//! Validation and pipeline lookup happen before anything is written. Once
//! the run exists it always ends the flow in exactly one of `SUBMITTED` or
//! `FAILED`, and the caller's result agrees with what was stored.

use std::sync::Arc;

use batchrun_core::error::CoreError;
use batchrun_core::lifecycle::{self, RunEvent};
use batchrun_core::pipeline::Pipeline;
use batchrun_core::run::{NewRun, Run};
use batchrun_core::status::RunStatus;
use batchrun_db::{RunStore, RunUpdate, StoreError};
use batchrun_workbench::{ExternalJobClient, JobClientError, SubmitJobRequest, SubmittedJob};

use crate::clock::Clock;
use crate::config::SubmissionConfig;
use crate::effects::report_effects;
use crate::retry::{retry_with_backoff, RetryOutcome};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Rejected or interrupted by the store. When this happens before the
    /// run is created (validation, unknown pipeline) nothing was written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The run was created but orchestration did not accept it. `run` is
    /// the stored record, normally in `FAILED`.
    #[error("Submission of pipeline run {} failed: {message}", .run.id)]
    Failed { run: Box<Run>, message: String },
}

impl From<CoreError> for SubmissionError {
    fn from(err: CoreError) -> Self {
        SubmissionError::Store(err.into())
    }
}

/// Creates runs and submits them to the external workbench.
pub struct SubmissionService {
    store: Arc<dyn RunStore>,
    client: Arc<dyn ExternalJobClient>,
    clock: Arc<dyn Clock>,
    config: SubmissionConfig,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn RunStore>,
        client: Arc<dyn ExternalJobClient>,
        clock: Arc<dyn Clock>,
        config: SubmissionConfig,
    ) -> Self {
        Self {
            store,
            client,
            clock,
            config,
        }
    }

    /// Create a run for `input` and submit it.
    ///
    /// Returns the run in `SUBMITTED` on success. Any failure after the run
    /// was created is returned as [`SubmissionError::Failed`] carrying the
    /// run as recorded.
    pub async fn create_and_submit(&self, input: NewRun) -> Result<Run, SubmissionError> {
        input.validate()?;
        let pipeline = self.store.get_pipeline(input.pipeline_id).await?;
        pipeline.ensure_runnable()?;

        let run = self.store.create_run(&input).await?;
        tracing::info!(
            run_id = run.id,
            pipeline_id = pipeline.id,
            "Pipeline run created",
        );

        match self.submit(&run, &pipeline).await {
            Ok(job) => self.record_submitted(run, job).await,
            Err(message) => Err(self.record_failed(run, message).await),
        }
    }

    /// Call orchestration under the retry policy, bounded by the overall
    /// submission timeout. Returns the failure message on error.
    async fn submit(&self, run: &Run, pipeline: &Pipeline) -> Result<SubmittedJob, String> {
        let request = SubmitJobRequest {
            run_id: run.id,
            input_path_prefix: run.input_path_prefix.clone(),
            output_path_prefix: run.output_path_prefix.clone(),
            report_path_prefix: run.report_path_prefix.clone(),
            workflow_name: pipeline.workflow_name.clone(),
            request_id: pipeline.request_id.clone(),
            mode: pipeline.mode,
        };

        let attempts = retry_with_backoff(
            &self.config.retry,
            self.clock.as_ref(),
            |_| self.client.submit_job(&request),
            JobClientError::is_retriable,
        );

        match tokio::time::timeout(self.config.submit_timeout, attempts).await {
            Err(_) => Err(format!(
                "Submission timed out after {}s",
                self.config.submit_timeout.as_secs_f64()
            )),
            Ok(RetryOutcome::Succeeded { value, .. }) => Ok(value),
            Ok(RetryOutcome::Aborted { error, .. }) => Err(error.to_string()),
            Ok(RetryOutcome::Exhausted { error, attempts }) => {
                Err(format!("{error} (gave up after {attempts} attempts)"))
            }
        }
    }

    async fn record_submitted(&self, run: Run, job: SubmittedJob) -> Result<Run, SubmissionError> {
        let event = RunEvent::SubmissionSucceeded {
            external_job_id: job.external_job_id.clone(),
        };
        let transition = match lifecycle::transition(&run, &event, self.clock.now()) {
            Ok(t) => t,
            Err(rejection) => {
                let message = format!("Malformed orchestration response: {rejection}");
                return Err(self.record_failed(run, message).await);
            }
        };

        match self
            .store
            .update_run_status(run.id, &RunUpdate::from(&transition))
            .await
        {
            Ok(updated) => {
                report_effects(updated.id, &transition.effects);
                tracing::debug!(
                    run_id = updated.id,
                    remote_status = %job.status,
                    "Orchestration accepted run",
                );
                Ok(updated)
            }
            Err(e) => {
                // The workbench job exists but the run could not be marked.
                tracing::error!(
                    run_id = run.id,
                    external_job_id = %job.external_job_id,
                    error = %e,
                    "Failed to record submitted run",
                );
                let message = format!(
                    "Workbench job {} was accepted but could not be recorded: {e}",
                    job.external_job_id
                );
                let failure = self.record_failed(run, message).await;
                let recorded = matches!(
                    &failure,
                    SubmissionError::Failed { run, .. } if run.status == RunStatus::Failed
                );
                Err(if recorded { failure } else { SubmissionError::Store(e) })
            }
        }
    }

    /// Move `run` to `FAILED` with `message` and build the caller's error.
    /// A store failure here is logged; the submission failure still wins.
    async fn record_failed(&self, run: Run, message: String) -> SubmissionError {
        tracing::warn!(run_id = run.id, error = %message, "Pipeline run submission failed");

        let event = RunEvent::SubmissionFailed {
            message: message.clone(),
        };
        let recorded = match lifecycle::transition(&run, &event, self.clock.now()) {
            Ok(transition) => match self
                .store
                .update_run_status(run.id, &RunUpdate::from(&transition))
                .await
            {
                Ok(updated) => {
                    report_effects(updated.id, &transition.effects);
                    updated
                }
                Err(e) => {
                    tracing::error!(
                        run_id = run.id,
                        error = %e,
                        "Failed to record submission failure",
                    );
                    run
                }
            },
            Err(rejection) => {
                tracing::error!(
                    run_id = run.id,
                    reason = %rejection,
                    "Submission failure not applicable to run",
                );
                run
            }
        };

        SubmissionError::Failed {
            run: Box::new(recorded),
            message,
        }
    }
}
