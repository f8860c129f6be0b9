// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

#[test]
fn status_codes_roundtrip() {
    for code in 0..=8 {
        let status = RunStatus::from_code(code).unwrap();
        assert_eq!(status.code(), code);
    }
    assert_eq!(RunStatus::from_code(9), None);
    assert_eq!(RunStatus::from_code(-1), None);
}

#[test]
fn reserved_statuses_keep_their_codes() {
    assert_eq!(RunStatus::Approved.code(), 1);
    assert_eq!(RunStatus::Canceled.code(), 7);
    assert_eq!(RunStatus::TimedOut.code(), 8);
}

#[test]
fn terminal_states() {
    assert!(RunStatus::Succeeded.is_terminal());
    assert!(RunStatus::Failed.is_terminal());
    assert!(RunStatus::Denied.is_terminal());
    assert!(!RunStatus::AwaitingApproval.is_terminal());
    assert!(!RunStatus::Dispatching.is_terminal());
    assert!(!RunStatus::Running.is_terminal());
}

#[test]
fn new_run_starts_awaiting_at_version_one() {
    let at = Utc::now();
    let run = Run::new(
        RunId::generate(),
        JobKey::new("demo").unwrap(),
        "dev:user1",
        "dev",
        "dev:user1",
        at,
    );
    assert_eq!(run.status, RunStatus::AwaitingApproval);
    assert_eq!(run.version, 1);
    assert_eq!(run.created_at, at);
    assert_eq!(run.updated_at, at);
}

#[test]
fn status_display_matches_wire_names() {
    assert_eq!(RunStatus::AwaitingApproval.to_string(), "AwaitingApproval");
    assert_eq!(RunStatus::Dispatching.to_string(), "Dispatching");
    assert_eq!(RunStatus::Succeeded.to_string(), "Succeeded");
}
