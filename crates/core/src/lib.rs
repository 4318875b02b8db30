//! Domain types and pure logic for pipeline run tracking.
//!
//! No I/O lives here: the lifecycle state machine, status vocabularies,
//! validation, and the shared error type are used by the store, the
//! submission flow, the reconciler, and the HTTP layer alike.

pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod remote_status;
pub mod run;
pub mod status;
pub mod types;
