//! Bounded retry with exponential backoff.
//!
//! [`retry_with_backoff`] calls an operation up to
//! [`RetryPolicy::max_attempts`] times, sleeping between attempts through the
//! injected [`Clock`]. The outcome is a value, not an error: callers decide
//! what an exhausted or aborted attempt means for them.

use std::future::Future;
use std::time::Duration;

use crate::clock::Clock;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of calls, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that calls the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `base_delay * multiplier^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(ms as u64)
    }
}

/// Result of [`retry_with_backoff`].
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded on attempt number `attempts`.
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed with a retriable error. Carries the last one.
    Exhausted { error: E, attempts: u32 },
    /// An attempt failed with a permanent error. No further attempts.
    Aborted { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Aborted { attempts, .. } => *attempts,
        }
    }

    /// Collapse into a plain `Result`, dropping the attempt count.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { error, .. } | RetryOutcome::Aborted { error, .. } => {
                Err(error)
            }
        }
    }
}

/// Call `op` until it succeeds, fails permanently, or the attempt budget is
/// spent. `is_retriable` decides whether an error is worth another attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    mut op: F,
    is_retriable: impl Fn(&E) -> bool,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Err(error) if !is_retriable(&error) => {
                return RetryOutcome::Aborted {
                    error,
                    attempts: attempt,
                }
            }
            Err(error) if attempt >= max_attempts => {
                return RetryOutcome::Exhausted {
                    error,
                    attempts: attempt,
                }
            }
            Err(error) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Attempt failed, backing off",
                );
                clock.sleep(delay).await;
            }
        }
    }
}
