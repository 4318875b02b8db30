use std::net::SocketAddr;
use std::sync::Arc;

use batchrun_db::{PgRunStore, RunStore};
use batchrun_pipeline::{Reconciler, SystemClock};
use batchrun_workbench::HttpJobClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batchrun_worker::config::WorkerConfig;
use batchrun_worker::drain::drain_reconciler;
use batchrun_worker::status::{self, WorkerState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batchrun_worker=debug,batchrun_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        poll_interval_secs = config.reconciler.poll_interval.as_secs(),
        max_concurrency = config.reconciler.max_concurrency,
        workbench_url = %config.workbench.workbench_url,
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = batchrun_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    batchrun_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    // --- Reconciler ---
    let store: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
    let client = HttpJobClient::new(&config.workbench).expect("Failed to build HTTP client");
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store),
        Arc::new(client),
        Arc::new(SystemClock),
        config.reconciler.clone(),
    ));

    let cancel = CancellationToken::new();
    let loop_handle = {
        let reconciler = Arc::clone(&reconciler);
        let cancel = cancel.clone();
        tokio::spawn(async move { reconciler.run(cancel).await })
    };

    // --- Status server ---
    let shutdown_timeout = config.shutdown_timeout;
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let app = status::router(WorkerState {
        store,
        config: Arc::new(config),
        reports: reconciler.subscribe(),
        cancel: cancel.clone(),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Worker status server listening");

    tokio::spawn(cancel_on_signal(cancel.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await
        .expect("Status server error");

    // --- Drain the reconciler ---
    tracing::info!("Waiting for the in-flight reconciliation cycle to finish");
    match drain_reconciler(loop_handle, shutdown_timeout).await {
        Ok(()) => tracing::info!("Reconciler stopped"),
        Err(e) => tracing::error!(error = %e, "Reconciler task failed"),
    }

    if tokio::time::timeout(shutdown_timeout, pool.close()).await.is_err() {
        tracing::warn!("Timed out closing database pool");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Cancel `token` on SIGINT, or SIGTERM on Unix.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Received SIGINT, stopping reconciler");
        }
        () = terminate => tracing::info!("Received SIGTERM, stopping reconciler"),
        () = token.cancelled() => return,
    }
    token.cancel();
}
