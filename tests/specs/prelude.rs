// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the scenario specs: a SQLite-backed service with
//! the dev router, plus helpers to drive it and to run workers against
//! its queue.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use textops_core::{OutboundMessage, SystemClock, WorkerId};
use textops_engine::{
    Orchestrator, OutboundSink, StubExecutor, Worker, WorkerConfig,
};
use textops_server::{router, AppState};
use textops_storage::{ExecutionQueue, SqliteStore};
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

pub use textops_storage::QueueEntryStatus;

/// Upper bound for any wait in these specs.
pub const SPEC_WAIT: Duration = Duration::from_secs(20);

/// Captures worker-delivered outbound messages for assertions. The
/// production sink writes the same messages to stderr.
#[derive(Default)]
pub struct CollectSink {
    delivered: Mutex<Vec<OutboundMessage>>,
}

impl CollectSink {
    pub fn bodies(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|messages| messages.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    pub fn channels(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|messages| messages.iter().map(|m| m.channel_id.clone()).collect())
            .unwrap_or_default()
    }
}

impl OutboundSink for CollectSink {
    fn deliver(&self, message: &OutboundMessage) {
        if let Ok(mut messages) = self.delivered.lock() {
            messages.push(message.clone());
        }
    }
}

/// One in-process TextOps service over a temp-file SQLite database.
pub struct Service {
    pub store: Arc<SqliteStore>,
    pub orchestrator: Arc<Orchestrator<SqliteStore, SystemClock>>,
    pub app: Router,
    pub sink: Arc<CollectSink>,
    _dir: tempfile::TempDir,
}

/// A spawned worker pair (polling + reclaim) that stops on drop.
pub struct WorkerHandle {
    cancel: CancellationToken,
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub async fn service() -> Service {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("textops.db").display());
    let store = Arc::new(SqliteStore::connect(&url).await.expect("open store"));
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), SystemClock));
    let state = AppState {
        orchestrator: orchestrator.clone(),
        queue: store.clone() as Arc<dyn ExecutionQueue>,
    };
    Service {
        app: router(state),
        store,
        orchestrator,
        sink: Arc::new(CollectSink::default()),
        _dir: dir,
    }
}

impl Service {
    /// Spawn a worker with fast polling and the stub executor.
    pub fn spawn_worker(&self, worker_id: &str) -> WorkerHandle {
        let config = WorkerConfig {
            worker_id: WorkerId::new(worker_id),
            poll_interval: Duration::from_millis(25),
            error_retry_delay: Duration::from_millis(50),
            max_attempts: 3,
            lock_timeout: Duration::from_secs(300),
            stale_check_interval: Duration::from_millis(50),
        };
        let executor = Arc::new(StubExecutor::new(
            self.orchestrator.clone(),
            config.worker_id.clone(),
        ));
        let worker = Arc::new(Worker::new(
            self.store.clone(),
            executor,
            self.sink.clone() as Arc<dyn OutboundSink>,
            config,
        ));
        let cancel = CancellationToken::new();
        {
            let worker = worker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await });
        }
        {
            let worker = worker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run_reclaim(cancel).await });
        }
        WorkerHandle { cancel }
    }

    pub async fn post_inbound(&self, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/dev/inbound")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    pub async fn get_run(&self, run_id: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/runs/{run_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    /// Poll the run until it reaches the wanted status.
    pub async fn wait_for_status(&self, run_id: &str, wanted: &str) {
        let deadline = tokio::time::Instant::now() + SPEC_WAIT;
        loop {
            let (_, detail) = self.get_run(run_id).await;
            if detail["run"]["status"] == wanted {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "run {run_id} never reached {wanted}; last: {}",
                detail["run"]["status"]
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Inbound payload from the canonical dev user.
pub fn inbound(body: &str, pmid: &str) -> serde_json::Value {
    serde_json::json!({
        "from": "user1",
        "conversation": "user1",
        "body": body,
        "providerMessageId": pmid,
    })
}

/// Event type names from a `GET /runs/{id}` response, in order.
pub fn event_types(detail: &serde_json::Value) -> Vec<String> {
    detail["events"]
        .as_array()
        .map(|events| {
            events
                .iter()
                .filter_map(|e| e["type"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Create a run via the API and return its id.
pub async fn create_run(service: &Service, job_key: &str, pmid: &str) -> String {
    let (status, body) = service
        .post_inbound(inbound(&format!("run {job_key}"), pmid))
        .await;
    assert_eq!(status, StatusCode::OK);
    body["runId"].as_str().expect("runId").to_string()
}

/// Create and approve a run via the API and return its id.
pub async fn approve_run(service: &Service, run_id: &str, pmid: &str) -> serde_json::Value {
    let (status, body) = service
        .post_inbound(inbound(&format!("yes {run_id}"), pmid))
        .await;
    assert_eq!(status, StatusCode::OK);
    body
}
