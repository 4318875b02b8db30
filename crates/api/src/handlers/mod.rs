pub mod pipeline_runs;
pub mod pipelines;
