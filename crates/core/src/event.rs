// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit events for the run timeline.

use crate::id::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of audit event types.
///
/// Per run, each type occurs at most once, and the two execution-terminal
/// types are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunEventKind {
    RunCreated,
    ApprovalRequested,
    RunApproved,
    RunDenied,
    ExecutionDispatched,
    ExecutionStarted,
    ExecutionSucceeded,
    ExecutionFailed,
}

crate::simple_display! {
    RunEventKind {
        RunCreated => "RunCreated",
        ApprovalRequested => "ApprovalRequested",
        RunApproved => "RunApproved",
        RunDenied => "RunDenied",
        ExecutionDispatched => "ExecutionDispatched",
        ExecutionStarted => "ExecutionStarted",
        ExecutionSucceeded => "ExecutionSucceeded",
        ExecutionFailed => "ExecutionFailed",
    }
}

impl RunEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RunEventKind::RunCreated => "RunCreated",
            RunEventKind::ApprovalRequested => "ApprovalRequested",
            RunEventKind::RunApproved => "RunApproved",
            RunEventKind::RunDenied => "RunDenied",
            RunEventKind::ExecutionDispatched => "ExecutionDispatched",
            RunEventKind::ExecutionStarted => "ExecutionStarted",
            RunEventKind::ExecutionSucceeded => "ExecutionSucceeded",
            RunEventKind::ExecutionFailed => "ExecutionFailed",
        }
    }

    /// Decode the persisted type string.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "RunCreated" => RunEventKind::RunCreated,
            "ApprovalRequested" => RunEventKind::ApprovalRequested,
            "RunApproved" => RunEventKind::RunApproved,
            "RunDenied" => RunEventKind::RunDenied,
            "ExecutionDispatched" => RunEventKind::ExecutionDispatched,
            "ExecutionStarted" => RunEventKind::ExecutionStarted,
            "ExecutionSucceeded" => RunEventKind::ExecutionSucceeded,
            "ExecutionFailed" => RunEventKind::ExecutionFailed,
            _ => return None,
        })
    }
}

/// Actor string conventions for the `actor` column.
pub mod actor {
    /// System-originated events (policy decisions, dispatch records).
    pub const SYSTEM: &str = "system";

    /// A human user identified by their channel address.
    pub fn user(address: &str) -> String {
        format!("user:{address}")
    }

    /// A worker identified by its worker id.
    pub fn worker(worker_id: &str) -> String {
        format!("worker:{worker_id}")
    }
}

/// An event not yet persisted: everything but the surrogate id and run id,
/// which the repository supplies at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRunEvent {
    #[serde(rename = "type")]
    pub kind: RunEventKind,
    pub at: DateTime<Utc>,
    pub actor: String,
    /// Opaque structured detail, stored as JSON and round-tripped verbatim.
    pub payload: serde_json::Value,
}

impl NewRunEvent {
    pub fn new(
        kind: RunEventKind,
        at: DateTime<Utc>,
        actor: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self { kind, at, actor: actor.into(), payload }
    }
}

/// A persisted audit record on a run's timeline. Never modified, never
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub id: i64,
    pub run_id: RunId,
    #[serde(rename = "type")]
    pub kind: RunEventKind,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
