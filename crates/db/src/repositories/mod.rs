//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod pipeline_repo;
pub mod run_repo;

pub use pipeline_repo::PipelineRepo;
pub use run_repo::RunRepo;
