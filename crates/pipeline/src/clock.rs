//! Time source for the submission flow and the reconciler.
//!
//! Everything that reads the wall clock or waits goes through [`Clock`] so
//! tests can substitute a clock that records sleeps instead of taking them.

use std::time::Duration;

use async_trait::async_trait;
use batchrun_core::types::Timestamp;
use chrono::Utc;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;

    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the system time and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
