// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the job runs and reports failure.

use crate::prelude::*;

#[tokio::test]
async fn failing_job_ends_in_failed_with_the_failure_summary() {
    let service = service().await;
    let run_id = create_run(&service, "deploy-fail", "m1").await;
    approve_run(&service, &run_id, "m2").await;

    let _worker = service.spawn_worker("worker-spec-fail");
    service.wait_for_status(&run_id, "Failed").await;

    let bodies = service.sink.bodies();
    assert_eq!(
        bodies,
        vec![format!(
            "Run {run_id} failed: Job 'deploy-fail' failed (simulated failure)"
        )]
    );

    let (_, detail) = service.get_run(&run_id).await;
    let types = event_types(&detail);
    assert!(types.contains(&"ExecutionFailed".to_string()));
    assert!(!types.contains(&"ExecutionSucceeded".to_string()));

    // The executor machinery worked, so the queue entry completed.
    let entries = service.store.queue_snapshot().await.expect("snapshot");
    assert_eq!(entries[0].status, QueueEntryStatus::Completed);
}
