// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: at-least-once delivery of the same provider message.

use crate::prelude::*;
use axum::http::StatusCode;

#[tokio::test]
async fn duplicate_inbound_changes_nothing() {
    let service = service().await;

    let (_, first) = service.post_inbound(inbound("run demo", "m1")).await;
    let run_id = first["runId"].as_str().expect("runId").to_string();

    let (status, second) = service.post_inbound(inbound("run demo", "m1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(second["runId"].is_null());
    assert_eq!(second["outbound"].as_array().expect("outbound").len(), 0);

    let (_, detail) = service.get_run(&run_id).await;
    let created = event_types(&detail)
        .iter()
        .filter(|t| *t == "RunCreated")
        .count();
    assert_eq!(created, 1, "exactly one RunCreated after redelivery");
}

#[tokio::test]
async fn duplicate_approval_does_not_dispatch_twice() {
    let service = service().await;
    let run_id = create_run(&service, "demo", "m1").await;

    let first = approve_run(&service, &run_id, "m2").await;
    assert_eq!(first["dispatchedExecution"], true);

    // Same provider message id: swallowed entirely.
    let repeat = approve_run(&service, &run_id, "m2").await;
    assert_eq!(repeat["dispatchedExecution"], false);
    assert!(repeat["runId"].is_null());
    assert_eq!(repeat["outbound"].as_array().expect("outbound").len(), 0);

    // A retyped approval is a new message and gets the in-band error.
    let retyped = approve_run(&service, &run_id, "m3").await;
    assert_eq!(retyped["dispatchedExecution"], false);
    assert!(retyped["outbound"][0]["body"]
        .as_str()
        .expect("outbound")
        .contains("Cannot approve"));

    let entries = service.store.queue_snapshot().await.expect("snapshot");
    assert_eq!(entries.len(), 1, "one queue entry despite repeats");
}
