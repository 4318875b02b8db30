use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Read `name` from the environment, falling back to `default`.
///
/// Panics with a descriptive message if the value does not parse. Only
/// meant for startup configuration.
pub fn env_or<T>(name: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.into());
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => panic!("{name} must be a valid {}: {e}", std::any::type_name::<T>()),
    }
}

/// Retry settings shared by submission and status queries.
///
/// | Env Var                 | Default |
/// |-------------------------|---------|
/// | `MAX_RETRIES`           | `3`     |
/// | `RETRY_BASE_DELAY_SECS` | `5`     |
pub fn retry_policy_from_env() -> RetryPolicy {
    RetryPolicy {
        max_attempts: env_or::<u32>("MAX_RETRIES", "3").max(1),
        base_delay: Duration::from_secs(env_or("RETRY_BASE_DELAY_SECS", "5")),
        ..Default::default()
    }
}

/// Settings for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Pause between cycles (default: 30s).
    pub poll_interval: Duration,
    /// Pause after a failed cycle before the next one (default: 5s).
    pub error_cooldown: Duration,
    /// Maximum number of runs reconciled concurrently (default: 4).
    pub max_concurrency: usize,
    /// Backoff for status queries.
    pub retry: RetryPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            error_cooldown: Duration::from_secs(5),
            max_concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `POLL_INTERVAL`         | `30`    |
    /// | `ERROR_COOLDOWN_SECS`   | `5`     |
    /// | `RECONCILE_CONCURRENCY` | `4`     |
    /// | `MAX_RETRIES`           | `3`     |
    /// | `RETRY_BASE_DELAY_SECS` | `5`     |
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(env_or("POLL_INTERVAL", "30")),
            error_cooldown: Duration::from_secs(env_or("ERROR_COOLDOWN_SECS", "5")),
            max_concurrency: env_or::<usize>("RECONCILE_CONCURRENCY", "4").max(1),
            retry: retry_policy_from_env(),
        }
    }
}

/// Settings for the submission flow.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Upper bound on the whole submission call, retries included
    /// (default: 60s).
    pub submit_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl SubmissionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `SUBMIT_TIMEOUT_SECS`   | `60`    |
    /// | `MAX_RETRIES`           | `3`     |
    /// | `RETRY_BASE_DELAY_SECS` | `5`     |
    pub fn from_env() -> Self {
        Self {
            submit_timeout: Duration::from_secs(env_or("SUBMIT_TIMEOUT_SECS", "60")),
            retry: retry_policy_from_env(),
        }
    }
}
