// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit tests for identifier types.

use super::*;

#[test]
fn generate_is_six_uppercase_hex() {
    for _ in 0..64 {
        let id = RunId::generate();
        let s = id.as_str();
        assert_eq!(s.len(), RUN_ID_LEN);
        assert!(
            s.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)),
            "not uppercase hex: {s}"
        );
    }
}

#[test]
fn parse_normalizes_case() {
    let id = RunId::parse("ab12cd").unwrap();
    assert_eq!(id.as_str(), "AB12CD");
    assert_eq!(id, RunId::parse("AB12CD").unwrap());
}

#[test]
fn parse_rejects_bad_input() {
    assert!(RunId::parse("").is_err());
    assert!(RunId::parse("AB12C").is_err());
    assert!(RunId::parse("AB12CDE").is_err());
    assert!(RunId::parse("AB12CG").is_err());
    assert!(RunId::parse("AB 2CD").is_err());
}

#[test]
fn run_id_serde_roundtrip() {
    let id = RunId::generate();
    let json = serde_json::to_string(&id).unwrap();
    let back: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn job_key_accepts_token_class() {
    assert!(JobKey::new("demo").is_ok());
    assert!(JobKey::new("deploy-fail").is_ok());
    assert!(JobKey::new("a_B-9").is_ok());
}

#[test]
fn job_key_rejects_non_tokens() {
    assert!(JobKey::new("").is_err());
    assert!(JobKey::new("has space").is_err());
    assert!(JobKey::new("semi;colon").is_err());
    assert!(JobKey::new("Ünïcode").is_err());
}

#[test]
fn worker_id_display() {
    let w = WorkerId::new("worker-host-1");
    assert_eq!(w.to_string(), "worker-host-1");
    assert_eq!(w.as_str(), "worker-host-1");
}
