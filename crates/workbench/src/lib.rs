//! Client library for the external job execution service ("workbench").
//!
//! Submission goes through the orchestration layer, which makes the single
//! call that creates the workbench job; status queries go to the workbench
//! directly. [`ExternalJobClient`] is the seam the rest of the system
//! depends on; [`HttpJobClient`] is the production implementation.

pub mod api;
pub mod client;
pub mod orchestrator;

pub use client::{
    ExternalJobClient, HttpJobClient, JobClientError, RemoteJobStatus, SubmitJobRequest,
    SubmittedJob, WorkbenchConfig,
};
