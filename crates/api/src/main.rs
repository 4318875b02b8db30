use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use batchrun_db::{DbPool, PgRunStore, RunStore};
use batchrun_pipeline::{SubmissionService, SystemClock};
use batchrun_workbench::HttpJobClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batchrun_api::app::build_app;
use batchrun_api::config::ServerConfig;
use batchrun_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batchrun_api=debug,batchrun_pipeline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        orchestrator_url = %config.workbench.orchestrator_url,
        submit_timeout_secs = config.submission.submit_timeout.as_secs(),
        max_attempts = config.submission.retry.max_attempts,
        "Loaded server configuration",
    );

    let pool = connect_database().await;

    let store: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
    let client = HttpJobClient::new(&config.workbench).expect("Failed to build HTTP client");
    let submission = SubmissionService::new(
        Arc::clone(&store),
        Arc::new(client),
        Arc::new(SystemClock),
        config.submission.clone(),
    );

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let app = build_app(AppState {
        store,
        submission: Arc::new(submission),
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Batch run API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if tokio::time::timeout(shutdown_timeout, pool.close()).await.is_err() {
        tracing::warn!("Timed out closing database pool");
    }
    tracing::info!("Shutdown complete");
}

/// Connect, verify, and migrate. Any failure aborts startup.
async fn connect_database() -> DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = batchrun_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    batchrun_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    batchrun_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database ready");
    pool
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.expect("Failed to install Ctrl-C handler");
                tracing::info!("Received SIGINT, draining connections");
            }
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, draining connections"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
        tracing::info!("Received Ctrl-C, draining connections");
    }
}
