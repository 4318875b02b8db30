use std::time::Duration;

use batchrun_pipeline::config::env_or;
use batchrun_pipeline::ReconcilerConfig;
use batchrun_workbench::WorkbenchConfig;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bind address for the status endpoints (default: `0.0.0.0`).
    pub host: String,
    /// Bind port for the status endpoints (default: `9000`).
    pub port: u16,
    /// Interval for "still draining" warnings while the in-flight cycle
    /// finishes, and the bound on closing the pool (default: `30`s).
    pub shutdown_timeout: Duration,
    pub reconciler: ReconcilerConfig,
    pub workbench: WorkbenchConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default   |
    /// |-------------------------|-----------|
    /// | `HOST`                  | `0.0.0.0` |
    /// | `PORT`                  | `9000`    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`      |
    ///
    /// See [`ReconcilerConfig::from_env`] and [`WorkbenchConfig::from_env`]
    /// for the remaining variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("PORT", "9000"),
            shutdown_timeout: Duration::from_secs(env_or("SHUTDOWN_TIMEOUT_SECS", "30")),
            reconciler: ReconcilerConfig::from_env(),
            workbench: WorkbenchConfig::from_env(),
        }
    }
}
