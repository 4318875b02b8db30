//! Predefined pipeline definitions referenced by runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// How a pipeline is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineMode {
    /// Submitted to the workbench through orchestration and tracked by polling.
    Batch,
    /// Executed synchronously by a realtime workflow. Not tracked here.
    Realtime,
}

impl PipelineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineMode::Batch => "BATCH",
            PipelineMode::Realtime => "REALTIME",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BATCH" => Ok(PipelineMode::Batch),
            "REALTIME" => Ok(PipelineMode::Realtime),
            other => Err(CoreError::Validation(format!(
                "Unknown pipeline mode '{other}'"
            ))),
        }
    }
}

/// A row from the `pipelines` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub id: DbId,
    pub workflow_name: String,
    pub mode: PipelineMode,
    /// Workbench request key forwarded with every submission.
    pub request_id: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Pipeline {
    /// Check that new runs may be started for this pipeline.
    pub fn ensure_runnable(&self) -> Result<(), CoreError> {
        if !self.is_active {
            return Err(CoreError::Validation(format!(
                "Pipeline {} is inactive",
                self.id
            )));
        }
        if self.mode != PipelineMode::Batch {
            return Err(CoreError::Validation(format!(
                "Pipeline {} runs in {} mode; only BATCH pipelines can be submitted",
                self.id, self.mode
            )));
        }
        Ok(())
    }
}
