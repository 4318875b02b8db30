//! Integration tests for the worker's `/health` and `/status` endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use batchrun_db::InMemoryRunStore;
use batchrun_pipeline::{CycleReport, ReconcilerConfig};
use batchrun_workbench::WorkbenchConfig;
use batchrun_worker::config::WorkerConfig;
use batchrun_worker::status::{router, WorkerState};
use chrono::Utc;
use http_body_util::BodyExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn test_config() -> WorkerConfig {
    WorkerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        shutdown_timeout: Duration::from_secs(1),
        reconciler: ReconcilerConfig::default(),
        workbench: WorkbenchConfig {
            orchestrator_url: "http://orchestrator.test".to_string(),
            workbench_url: "http://workbench.test".to_string(),
            request_timeout: Duration::from_secs(1),
        },
    }
}

fn app(reports: watch::Receiver<Option<CycleReport>>, cancel: CancellationToken) -> Router {
    router(WorkerState {
        store: Arc::new(InMemoryRunStore::new()),
        config: Arc::new(test_config()),
        reports,
        cancel,
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_store_reachable() {
    let (_tx, rx) = watch::channel(None);
    let (status, json) = get_json(app(rx, CancellationToken::new()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
}

#[tokio::test]
async fn status_before_first_cycle_has_no_report() {
    let (_tx, rx) = watch::channel(None);
    let (status, json) = get_json(app(rx, CancellationToken::new()), "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], true);
    assert_eq!(json["poll_interval_secs"], 30);
    assert_eq!(json["max_concurrency"], 4);
    assert_eq!(json["workbench_url"], "http://workbench.test");
    assert!(json["last_cycle"].is_null());
}

#[tokio::test]
async fn status_shows_latest_cycle_and_shutdown() {
    let (tx, rx) = watch::channel(None);
    tx.send_replace(Some(CycleReport {
        started_at: Utc::now(),
        duration_ms: 12,
        examined: 5,
        transitioned: 2,
        unchanged: 1,
        deferred: 1,
        skipped: 1,
        failed: 0,
    }));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (_, json) = get_json(app(rx, cancel), "/status").await;

    assert_eq!(json["running"], false);
    assert_eq!(json["last_cycle"]["examined"], 5);
    assert_eq!(json["last_cycle"]["transitioned"], 2);
    assert_eq!(json["last_cycle"]["deferred"], 1);
}
