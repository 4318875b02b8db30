use batchrun_core::lifecycle::LifecycleEffect;
use batchrun_core::types::DbId;

/// Log the effects of an applied transition.
pub(crate) fn report_effects(run_id: DbId, effects: &[LifecycleEffect]) {
    for effect in effects {
        match effect {
            LifecycleEffect::Submitted { external_job_id } => {
                tracing::info!(run_id, external_job_id = %external_job_id, "Pipeline run submitted");
            }
            LifecycleEffect::Started => {
                tracing::info!(run_id, "Pipeline run started");
            }
            LifecycleEffect::Finished { status } => {
                tracing::info!(run_id, status = %status, "Pipeline run finished");
            }
        }
    }
}
