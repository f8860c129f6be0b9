// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a worker dies holding a claim; the reclaim sweep recovers
//! the entry and another worker finishes the run.

use crate::prelude::*;
use std::time::Duration;
use textops_core::WorkerId;
use textops_storage::ExecutionQueue;

#[tokio::test]
async fn stale_claim_is_reclaimed_and_completed_by_another_worker() {
    let service = service().await;
    let run_id = create_run(&service, "demo", "m1").await;
    approve_run(&service, &run_id, "m2").await;

    // Worker A claims the entry and dies without reporting. Simulate the
    // death by backdating the lock past the timeout.
    let entry = service
        .store
        .claim_next(&WorkerId::new("worker-a"))
        .await
        .expect("claim")
        .expect("entry");
    assert_eq!(entry.attempts, 1);
    service
        .store
        .backdate_lock(entry.id, Duration::from_secs(6 * 60))
        .await
        .expect("backdate");

    // Worker B's reclaim sweep returns it to pending, then its polling
    // loop claims and completes it.
    let _worker = service.spawn_worker("worker-b");
    service.wait_for_status(&run_id, "Succeeded").await;

    let entries = service.store.queue_snapshot().await.expect("snapshot");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, QueueEntryStatus::Completed);
    assert!(entries[0].attempts >= 2, "reclaimed claim counted");
    assert_eq!(
        entries[0].locked_by, None,
        "completion clears the lock fields"
    );
}
