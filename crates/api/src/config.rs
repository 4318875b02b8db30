use std::time::Duration;

use batchrun_pipeline::config::env_or;
use batchrun_pipeline::SubmissionConfig;
use batchrun_workbench::WorkbenchConfig;

/// API server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Upper bound on closing the database pool after the server stops.
    pub shutdown_timeout_secs: u64,
    pub workbench: WorkbenchConfig,
    pub submission: SubmissionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `90`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    ///
    /// Orchestration endpoints come from [`WorkbenchConfig::from_env`],
    /// timeouts and retries from [`SubmissionConfig::from_env`].
    ///
    /// Panics if the submission timeout does not fit inside the request
    /// timeout (see [`ServerConfig::check_timeouts`]).
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let config = Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("PORT", "3000"),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "90"),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", "30"),
            workbench: WorkbenchConfig::from_env(),
            submission: SubmissionConfig::from_env(),
        };

        if let Err(e) = config.check_timeouts() {
            panic!("{e}");
        }
        config
    }

    /// The whole submission, retries included, must end before the HTTP
    /// request times out so the caller sees the recorded outcome.
    pub fn check_timeouts(&self) -> Result<(), String> {
        let request_timeout = Duration::from_secs(self.request_timeout_secs);
        if self.submission.submit_timeout >= request_timeout {
            return Err(format!(
                "SUBMIT_TIMEOUT_SECS ({}s) must be below REQUEST_TIMEOUT_SECS ({}s)",
                self.submission.submit_timeout.as_secs(),
                self.request_timeout_secs,
            ));
        }
        Ok(())
    }
}
