//! Pipeline run status, mapping to the `pipeline_run_statuses` lookup table.
//!
//! Each variant's discriminant matches the seed data order (1-based) in the
//! lookup table. The upper-case name is the wire representation used by the
//! HTTP API and in log fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Lifecycle status of a pipeline run.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Created = 1,
    Submitted = 2,
    Running = 3,
    Completed = 4,
    Failed = 5,
    Cancelled = 6,
}

/// Statuses eligible for reconciliation.
pub const ACTIVE_STATUSES: [RunStatus; 2] = [RunStatus::Submitted, RunStatus::Running];

/// Statuses from which no further transition occurs.
pub const TERMINAL_STATUSES: [RunStatus; 3] =
    [RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled];

const ALL: [RunStatus; 6] = [
    RunStatus::Created,
    RunStatus::Submitted,
    RunStatus::Running,
    RunStatus::Completed,
    RunStatus::Failed,
    RunStatus::Cancelled,
];

impl RunStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Resolve a database status ID. Returns `None` for IDs outside the seed data.
    pub fn from_id(id: StatusId) -> Option<Self> {
        ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Created => "CREATED",
            RunStatus::Submitted => "SUBMITTED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    pub fn is_active(self) -> bool {
        ACTIVE_STATUSES.contains(&self)
    }
}

impl From<RunStatus> for StatusId {
    fn from(value: RunStatus) -> Self {
        value as StatusId
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    /// Parse a status name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ALL.into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::Validation(format!("Unknown run status '{wanted}'")))
    }
}

/// Parse a comma-separated status filter such as `RUNNING,SUBMITTED`.
///
/// Empty segments are ignored, so `""` yields an empty list.
pub fn parse_status_list(raw: &str) -> Result<Vec<RunStatus>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RunStatus::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_ids_match_seed_data() {
        assert_eq!(RunStatus::Created.id(), 1);
        assert_eq!(RunStatus::Submitted.id(), 2);
        assert_eq!(RunStatus::Running.id(), 3);
        assert_eq!(RunStatus::Completed.id(), 4);
        assert_eq!(RunStatus::Failed.id(), 5);
        assert_eq!(RunStatus::Cancelled.id(), 6);
    }

    #[test]
    fn from_id_round_trips_and_rejects_unknown() {
        for status in ALL {
            assert_eq!(RunStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(RunStatus::from_id(0), None);
        assert_eq!(RunStatus::from_id(7), None);
    }

    #[test]
    fn active_and_terminal_are_disjoint() {
        for status in ALL {
            assert!(!(status.is_active() && status.is_terminal()), "{status}");
        }
        assert!(!RunStatus::Created.is_active());
        assert!(!RunStatus::Created.is_terminal());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("running".parse::<RunStatus>().unwrap(), RunStatus::Running);
        assert_eq!(" Cancelled ".parse::<RunStatus>().unwrap(), RunStatus::Cancelled);
        assert!("paused".parse::<RunStatus>().is_err());
    }

    #[test]
    fn status_list_parsing() {
        let list = parse_status_list("RUNNING,SUBMITTED").unwrap();
        assert_eq!(list, vec![RunStatus::Running, RunStatus::Submitted]);
        assert!(parse_status_list(" , ").unwrap().is_empty());
        assert!(parse_status_list("RUNNING,BOGUS").is_err());
    }

    #[test]
    fn serializes_as_upper_case_name() {
        let json = serde_json::to_string(&RunStatus::Submitted).unwrap();
        assert_eq!(json, "\"SUBMITTED\"");
    }
}
