//! Waiting for the reconciler loop to stop.

use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};

/// Wait for the reconciler task to return, however long its in-flight
/// cycle takes. Every external call in a cycle is time-bounded, so the
/// cycle always ends; `warn_every` only controls how often a slow drain is
/// reported.
pub async fn drain_reconciler(
    mut handle: JoinHandle<()>,
    warn_every: Duration,
) -> Result<(), JoinError> {
    let mut waited = Duration::ZERO;
    loop {
        tokio::select! {
            result = &mut handle => return result,
            () = tokio::time::sleep(warn_every) => {
                waited += warn_every;
                tracing::warn!(
                    waited_secs = waited.as_secs(),
                    "Still waiting for the in-flight reconciliation cycle",
                );
            }
        }
    }
}
