//! Workbench job status vocabulary.
//!
//! The workbench reports free-form status strings. They are folded into a
//! small closed set here; anything unrecognised is kept verbatim as
//! [`RemoteStatus::Unknown`] so callers can log it without guessing.

use serde::Serialize;

/// A workbench job status, normalised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Accepted but not yet executing.
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// A status string outside the known vocabulary.
    Unknown(String),
}

impl RemoteStatus {
    /// Normalise a raw status string. Matching ignores case and surrounding
    /// whitespace, and treats `-` and spaces as `_`.
    pub fn parse(raw: &str) -> Self {
        let normalised = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalised.as_str() {
            "SUBMITTED" | "QUEUED" | "PENDING" | "ACCEPTED" => RemoteStatus::Queued,
            "RUNNING" | "IN_PROGRESS" | "PROCESSING" | "STARTED" => RemoteStatus::Running,
            "COMPLETED" | "SUCCESS" | "SUCCEEDED" | "FINISHED" => RemoteStatus::Succeeded,
            "FAILED" | "ERROR" => RemoteStatus::Failed,
            "CANCELLED" | "CANCELED" => RemoteStatus::Cancelled,
            _ => RemoteStatus::Unknown(raw.to_string()),
        }
    }
}
