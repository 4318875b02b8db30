//! Run orchestration: submitting new runs to the workbench and
//! reconciling active runs against the workbench's reported status.

pub mod clock;
pub mod config;
mod effects;
pub mod reconciler;
pub mod retry;
pub mod submission;

pub use clock::{Clock, SystemClock};
pub use config::{ReconcilerConfig, SubmissionConfig};
pub use reconciler::{CycleError, CycleReport, Reconciler};
pub use retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
pub use submission::{SubmissionError, SubmissionService};
