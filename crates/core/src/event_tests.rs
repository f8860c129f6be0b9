// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde round-trips for event kinds and payloads.

use super::*;
use proptest::prelude::*;

const ALL_KINDS: [RunEventKind; 8] = [
    RunEventKind::RunCreated,
    RunEventKind::ApprovalRequested,
    RunEventKind::RunApproved,
    RunEventKind::RunDenied,
    RunEventKind::ExecutionDispatched,
    RunEventKind::ExecutionStarted,
    RunEventKind::ExecutionSucceeded,
    RunEventKind::ExecutionFailed,
];

#[test]
fn kind_string_roundtrip() {
    for kind in ALL_KINDS {
        assert_eq!(RunEventKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(RunEventKind::parse("NotAnEvent"), None);
}

#[test]
fn kind_serde_uses_wire_names() {
    let json = serde_json::to_string(&RunEventKind::ExecutionSucceeded).unwrap();
    assert_eq!(json, "\"ExecutionSucceeded\"");
}

#[test]
fn actor_conventions() {
    assert_eq!(actor::user("dev:user1"), "user:dev:user1");
    assert_eq!(actor::worker("worker-h-1"), "worker:worker-h-1");
    assert_eq!(actor::SYSTEM, "system");
}

#[test]
fn persisted_event_roundtrip() {
    let event = RunEvent {
        id: 7,
        run_id: RunId::parse("AB12CD").unwrap(),
        kind: RunEventKind::ExecutionSucceeded,
        at: chrono::Utc::now(),
        actor: actor::worker("w1"),
        payload: serde_json::json!({"workerId": "w1", "summary": "ok"}),
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: RunEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(event, back);
}

/// Arbitrary JSON-ish payload values: scalars, strings, and flat objects,
/// which covers what the orchestrator actually writes.
fn payload_strategy() -> impl Strategy<Value = serde_json::Value> {
    let scalar = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        "[a-zA-Z0-9 :_-]{0,40}".prop_map(serde_json::Value::from),
    ];
    proptest::collection::btree_map("[a-zA-Z][a-zA-Z0-9]{0,12}", scalar, 0..5).prop_map(|m| {
        serde_json::Value::Object(m.into_iter().collect())
    })
}

proptest! {
    #[test]
    fn payload_json_roundtrip_preserves_content(payload in payload_strategy()) {
        let event = NewRunEvent::new(
            RunEventKind::RunCreated,
            chrono::Utc::now(),
            actor::SYSTEM,
            payload.clone(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: NewRunEvent = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.payload, payload);
    }
}
