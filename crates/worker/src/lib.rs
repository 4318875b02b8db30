//! Background reconciliation worker.
//!
//! Hosts the [`batchrun_pipeline::Reconciler`] loop and a small HTTP
//! surface for liveness and loop status.

pub mod config;
pub mod drain;
pub mod status;
