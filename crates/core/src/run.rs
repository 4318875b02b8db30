//! Pipeline run record and creation input.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::RunStatus;
use crate::types::{DbId, Timestamp};

/// Maximum length of a storage location prefix.
pub const MAX_PREFIX_LEN: usize = 1024;

/// One tracked execution of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub id: DbId,
    pub pipeline_id: DbId,
    pub status: RunStatus,
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

impl Run {
    /// Describe the first record invariant this run violates, if any.
    ///
    /// - `completed_at` is set iff the status is terminal.
    /// - `external_job_id` is set for `SUBMITTED` and `RUNNING`, and for any
    ///   terminal state that has a `started_at` (reached via submission).
    /// - `error_message` is only set on `FAILED` or `CANCELLED`.
    pub fn invariant_violation(&self) -> Option<String> {
        let terminal = self.status.is_terminal();
        if terminal != self.completed_at.is_some() {
            return Some(format!(
                "completed_at must be set iff status is terminal (status {})",
                self.status
            ));
        }

        let submitted_path = self.status.is_active() || (terminal && self.started_at.is_some());
        if submitted_path && self.external_job_id.is_none() {
            return Some(format!(
                "external_job_id must be set for a submitted run (status {})",
                self.status
            ));
        }
        if self.status == RunStatus::Created && self.external_job_id.is_some() {
            return Some("external_job_id must not be set while CREATED".to_string());
        }

        if self.error_message.is_some()
            && !matches!(self.status, RunStatus::Failed | RunStatus::Cancelled)
        {
            return Some(format!(
                "error_message is only allowed on FAILED or CANCELLED (status {})",
                self.status
            ));
        }

        None
    }
}

/// Input for inserting a new run in `CREATED` state.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRun {
    pub pipeline_id: DbId,
    pub input_path_prefix: String,
    pub output_path_prefix: String,
    pub report_path_prefix: Option<String>,
}

impl NewRun {
    /// Validate the location fields.
    ///
    /// Input and output prefixes are required and must be non-blank. The
    /// report prefix is optional but must be non-blank when given.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.pipeline_id <= 0 {
            return Err(CoreError::Validation(
                "pipeline_id must be a positive id".to_string(),
            ));
        }
        validate_prefix("input_path_prefix", &self.input_path_prefix)?;
        validate_prefix("output_path_prefix", &self.output_path_prefix)?;
        if let Some(report) = &self.report_path_prefix {
            validate_prefix("report_path_prefix", report)?;
        }
        Ok(())
    }
}

fn validate_prefix(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_PREFIX_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {MAX_PREFIX_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn new_run() -> NewRun {
        NewRun {
            pipeline_id: 7,
            input_path_prefix: "/in/7".to_string(),
            output_path_prefix: "/out/7".to_string(),
            report_path_prefix: Some("/rep/7".to_string()),
        }
    }

    fn created_run() -> Run {
        let now = Utc::now();
        Run {
            id: 1,
            pipeline_id: 7,
            status: RunStatus::Created,
            external_job_id: None,
            error_message: None,
            input_path_prefix: "/in/7".to_string(),
            output_path_prefix: "/out/7".to_string(),
            report_path_prefix: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_new_run_passes() {
        assert!(new_run().validate().is_ok());
        let without_report = NewRun {
            report_path_prefix: None,
            ..new_run()
        };
        assert!(without_report.validate().is_ok());
    }

    #[test]
    fn blank_prefixes_are_rejected() {
        let run = NewRun {
            input_path_prefix: "   ".to_string(),
            ..new_run()
        };
        assert_matches!(run.validate(), Err(CoreError::Validation(msg)) if msg.contains("input_path_prefix"));

        let run = NewRun {
            report_path_prefix: Some(String::new()),
            ..new_run()
        };
        assert_matches!(run.validate(), Err(CoreError::Validation(msg)) if msg.contains("report_path_prefix"));
    }

    #[test]
    fn non_positive_pipeline_id_is_rejected() {
        let run = NewRun {
            pipeline_id: 0,
            ..new_run()
        };
        assert_matches!(run.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn overlong_prefix_is_rejected() {
        let run = NewRun {
            output_path_prefix: "x".repeat(MAX_PREFIX_LEN + 1),
            ..new_run()
        };
        assert_matches!(run.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn created_run_satisfies_invariants() {
        assert_eq!(created_run().invariant_violation(), None);
    }

    #[test]
    fn terminal_without_completed_at_is_flagged() {
        let run = Run {
            status: RunStatus::Failed,
            error_message: Some("boom".to_string()),
            ..created_run()
        };
        assert!(run.invariant_violation().is_some());
    }

    #[test]
    fn active_without_job_id_is_flagged() {
        let run = Run {
            status: RunStatus::Running,
            started_at: Some(Utc::now()),
            ..created_run()
        };
        assert!(run.invariant_violation().is_some());
    }

    #[test]
    fn error_message_on_running_is_flagged() {
        let run = Run {
            status: RunStatus::Running,
            external_job_id: Some("wb-1".to_string()),
            started_at: Some(Utc::now()),
            error_message: Some("stale".to_string()),
            ..created_run()
        };
        assert!(run.invariant_violation().is_some());
    }
}
