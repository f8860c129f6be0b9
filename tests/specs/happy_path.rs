// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: request, approve, execute, succeed.

use crate::prelude::*;
use axum::http::StatusCode;

#[tokio::test]
async fn request_approve_execute_succeed() {
    let service = service().await;

    // Request the run.
    let (status, created) = service.post_inbound(inbound("run demo", "m1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["intentType"], "RunJob");
    assert_eq!(created["jobKey"], "demo");
    assert_eq!(created["dispatchedExecution"], false);
    let run_id = created["runId"].as_str().expect("runId").to_string();
    assert_eq!(run_id.len(), 6);
    assert!(run_id
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
    let approval = created["outbound"][0]["body"].as_str().expect("outbound");
    assert!(approval.contains(&format!("YES {run_id} to approve")));
    assert!(approval.contains(&format!("NO {run_id} to deny")));

    // Approve it.
    let approved = approve_run(&service, &run_id, "m2").await;
    assert_eq!(approved["dispatchedExecution"], true);
    assert!(approved["outbound"][0]["body"]
        .as_str()
        .expect("outbound")
        .starts_with(&format!("Approved. Starting run {run_id}")));

    // A worker picks it up and the stub executor completes it.
    let _worker = service.spawn_worker("worker-spec-1");
    service.wait_for_status(&run_id, "Succeeded").await;

    // The completion outbound went through the worker's sink (the
    // production sink prints these to stderr).
    let bodies = service.sink.bodies();
    assert_eq!(
        bodies,
        vec![format!(
            "Run {run_id} succeeded: Job 'demo' completed successfully"
        )]
    );
    assert_eq!(service.sink.channels(), vec!["dev".to_string()]);

    // Full ordered audit trail.
    let (status, detail) = service.get_run(&run_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["run"]["status"], "Succeeded");
    assert_eq!(
        event_types(&detail),
        vec![
            "RunCreated",
            "ApprovalRequested",
            "RunApproved",
            "ExecutionDispatched",
            "ExecutionStarted",
            "ExecutionSucceeded",
        ]
    );

    // The queue entry settled.
    let entries = service.store.queue_snapshot().await.expect("snapshot");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, QueueEntryStatus::Completed);
    assert_eq!(entries[0].attempts, 1);
}
