// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a command that is invalid for the run's current state.

use crate::prelude::*;
use axum::http::StatusCode;

#[tokio::test]
async fn deny_after_approve_reports_mismatch_without_side_effects() {
    let service = service().await;
    let run_id = create_run(&service, "demo", "m1").await;
    approve_run(&service, &run_id, "m2").await;

    let (status, denied) = service
        .post_inbound(inbound(&format!("no {run_id}"), "m4"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(denied["outbound"][0]["body"]
        .as_str()
        .expect("outbound")
        .contains("Cannot deny"));

    let (_, detail) = service.get_run(&run_id).await;
    // No worker is running, so the run sits in Dispatching.
    assert_eq!(detail["run"]["status"], "Dispatching");
    assert!(
        !event_types(&detail).contains(&"RunDenied".to_string()),
        "failed deny must append nothing"
    );
}
