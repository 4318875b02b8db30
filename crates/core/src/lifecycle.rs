//! Run lifecycle state machine.
//!
//! ```text
//! CREATED ──submit ok──▶ SUBMITTED ──running──▶ RUNNING ──succeeded──▶ COMPLETED
//!    │                       │                     ├──────failed──────▶ FAILED
//!    └──submit failed──▶ FAILED ◀──failed──┘       └─────cancelled────▶ CANCELLED
//! ```
//!
//! [`transition`] is a pure function from a run snapshot and an event to the
//! next snapshot plus the effects the caller should report. It never touches
//! storage; the store applies the resulting snapshot atomically with a
//! compare-and-set on the prior status.
//!
//! A remote success or cancellation observed while the run is still
//! `SUBMITTED` means the job started and finished between two polls. It is
//! applied as the two table edges `SUBMITTED → RUNNING → target` in one step.

use crate::remote_status::RemoteStatus;
use crate::run::Run;
use crate::status::RunStatus;
use crate::types::Timestamp;

/// Error message recorded when the workbench reports failure without detail.
pub const DEFAULT_REMOTE_FAILURE_MESSAGE: &str = "Workbench reported job failure";

/// Something that happened to a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Orchestration accepted the run and returned a workbench job id.
    SubmissionSucceeded { external_job_id: String },
    /// Orchestration failed (timeout, rejection, malformed response).
    SubmissionFailed { message: String },
    /// The workbench reported a status for the run's job.
    RemoteReported {
        status: RemoteStatus,
        error_detail: Option<String>,
    },
    /// The workbench has no record of the run's job.
    RemoteLost { message: String },
}

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            RunEvent::SubmissionSucceeded { .. } => "submission_succeeded",
            RunEvent::SubmissionFailed { .. } => "submission_failed",
            RunEvent::RemoteReported { .. } => "remote_reported",
            RunEvent::RemoteLost { .. } => "remote_lost",
        }
    }
}

/// Side effect of an applied transition, reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEffect {
    Submitted { external_job_id: String },
    Started,
    Finished { status: RunStatus },
}

/// An accepted transition: the new snapshot and its effects.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: RunStatus,
    pub run: Run,
    pub effects: Vec<LifecycleEffect>,
}

impl Transition {
    pub fn to(&self) -> RunStatus {
        self.run.status
    }
}

/// Why an event produced no transition. Every rejection is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("run is already terminal ({status})")]
    Terminal { status: RunStatus },

    #[error("run is already {status}")]
    Unchanged { status: RunStatus },

    #[error("{event} is not allowed from {from}")]
    NotAllowed { from: RunStatus, event: &'static str },

    #[error("transition {from} -> {to} is not in the lifecycle table")]
    NoEdge { from: RunStatus, to: RunStatus },

    #[error("unrecognised workbench status '{raw}'")]
    UnknownRemoteStatus { raw: String },

    #[error("submission returned an empty external job id")]
    EmptyJobId,
}

/// The lifecycle transition table. Returns `true` iff `from → to` is an edge.
pub fn is_edge(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    matches!(
        (from, to),
        (Created, Submitted)
            | (Created, Failed)
            | (Submitted, Running)
            | (Submitted, Failed)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, Cancelled)
    )
}

/// Compute the transition `event` causes on `current`, stamped with `now`.
pub fn transition(current: &Run, event: &RunEvent, now: Timestamp) -> Result<Transition, Rejection> {
    let from = current.status;
    if from.is_terminal() {
        return Err(Rejection::Terminal { status: from });
    }

    match event {
        RunEvent::SubmissionSucceeded { external_job_id } => {
            if from != RunStatus::Created {
                return Err(Rejection::NotAllowed { from, event: event.name() });
            }
            if external_job_id.trim().is_empty() {
                return Err(Rejection::EmptyJobId);
            }
            let mut run = current.clone();
            run.status = RunStatus::Submitted;
            run.external_job_id = Some(external_job_id.clone());
            run.started_at = Some(now);
            run.updated_at = now;
            Ok(Transition {
                from,
                run,
                effects: vec![LifecycleEffect::Submitted {
                    external_job_id: external_job_id.clone(),
                }],
            })
        }

        RunEvent::SubmissionFailed { message } => {
            if from != RunStatus::Created {
                return Err(Rejection::NotAllowed { from, event: event.name() });
            }
            Ok(walk(current, &[RunStatus::Failed], Some(message.clone()), now))
        }

        RunEvent::RemoteReported { status, error_detail } => {
            if !from.is_active() {
                return Err(Rejection::NotAllowed { from, event: event.name() });
            }
            let target = match status {
                RemoteStatus::Queued => RunStatus::Submitted,
                RemoteStatus::Running => RunStatus::Running,
                RemoteStatus::Succeeded => RunStatus::Completed,
                RemoteStatus::Failed => RunStatus::Failed,
                RemoteStatus::Cancelled => RunStatus::Cancelled,
                RemoteStatus::Unknown(raw) => {
                    return Err(Rejection::UnknownRemoteStatus { raw: raw.clone() })
                }
            };
            let path = path_to(from, target)?;
            let error = match target {
                RunStatus::Failed => Some(
                    error_detail
                        .clone()
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_REMOTE_FAILURE_MESSAGE.to_string()),
                ),
                RunStatus::Cancelled => error_detail.clone(),
                _ => None,
            };
            Ok(walk(current, &path, error, now))
        }

        RunEvent::RemoteLost { message } => {
            if !from.is_active() {
                return Err(Rejection::NotAllowed { from, event: event.name() });
            }
            let path = path_to(from, RunStatus::Failed)?;
            Ok(walk(current, &path, Some(message.clone()), now))
        }
    }
}

/// Find the edge sequence from `from` to `to`: a direct edge, or the
/// `SUBMITTED → RUNNING → to` shortcut for jobs that finished between polls.
fn path_to(from: RunStatus, to: RunStatus) -> Result<Vec<RunStatus>, Rejection> {
    if from == to {
        return Err(Rejection::Unchanged { status: from });
    }
    if is_edge(from, to) {
        return Ok(vec![to]);
    }
    if from == RunStatus::Submitted && is_edge(RunStatus::Running, to) {
        return Ok(vec![RunStatus::Running, to]);
    }
    Err(Rejection::NoEdge { from, to })
}

/// Apply a validated edge sequence to a copy of `current`.
fn walk(current: &Run, path: &[RunStatus], error: Option<String>, now: Timestamp) -> Transition {
    let from = current.status;
    let mut run = current.clone();
    let mut effects = Vec::with_capacity(path.len());

    for &step in path {
        debug_assert!(is_edge(run.status, step));
        run.status = step;
        if step == RunStatus::Running {
            effects.push(LifecycleEffect::Started);
        }
        if step.is_terminal() {
            run.completed_at = Some(now);
            run.error_message = error.clone();
            effects.push(LifecycleEffect::Finished { status: step });
        }
    }
    run.updated_at = now;

    Transition { from, run, effects }
}
