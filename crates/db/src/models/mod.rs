//! Row types for the run tracker tables.
//!
//! Rows mirror the table columns exactly and are converted into the
//! `batchrun_core` domain types at the repository boundary.

pub mod pipeline;
pub mod run;
