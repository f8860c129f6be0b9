// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a human denies the run.

use crate::prelude::*;
use axum::http::StatusCode;

#[tokio::test]
async fn deny_is_terminal_and_never_dispatches() {
    let service = service().await;
    let run_id = create_run(&service, "demo", "m1").await;

    let (status, denied) = service
        .post_inbound(inbound(&format!("no {run_id}"), "m3"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(denied["intentType"], "DenyRun");
    assert_eq!(denied["dispatchedExecution"], false);
    assert!(denied["outbound"][0]["body"]
        .as_str()
        .expect("outbound")
        .contains(&format!("Denied run {run_id}")));

    let (_, detail) = service.get_run(&run_id).await;
    assert_eq!(detail["run"]["status"], "Denied");
    let types = event_types(&detail);
    assert!(types.contains(&"RunDenied".to_string()));
    assert!(
        !types.contains(&"ExecutionDispatched".to_string()),
        "denied run must never dispatch"
    );

    let entries = service.store.queue_snapshot().await.expect("snapshot");
    assert!(entries.is_empty(), "nothing was enqueued");
}
