// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run entity and status state machine.

use crate::id::{JobKey, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a run.
///
/// `Approved`, `Canceled`, and `TimedOut` are reserved: their integer codes
/// are part of the storage contract and must decode, but no transition ever
/// targets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    AwaitingApproval,
    Approved,
    Denied,
    Dispatching,
    Running,
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
}

crate::simple_display! {
    RunStatus {
        AwaitingApproval => "AwaitingApproval",
        Approved => "Approved",
        Denied => "Denied",
        Dispatching => "Dispatching",
        Running => "Running",
        Succeeded => "Succeeded",
        Failed => "Failed",
        Canceled => "Canceled",
        TimedOut => "TimedOut",
    }
}

impl RunStatus {
    /// Integer code persisted in the runs table.
    pub fn code(self) -> i64 {
        match self {
            RunStatus::AwaitingApproval => 0,
            RunStatus::Approved => 1,
            RunStatus::Denied => 2,
            RunStatus::Dispatching => 3,
            RunStatus::Running => 4,
            RunStatus::Succeeded => 5,
            RunStatus::Failed => 6,
            RunStatus::Canceled => 7,
            RunStatus::TimedOut => 8,
        }
    }

    /// Decode a persisted status code.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => RunStatus::AwaitingApproval,
            1 => RunStatus::Approved,
            2 => RunStatus::Denied,
            3 => RunStatus::Dispatching,
            4 => RunStatus::Running,
            5 => RunStatus::Succeeded,
            6 => RunStatus::Failed,
            7 => RunStatus::Canceled,
            8 => RunStatus::TimedOut,
            _ => return None,
        })
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Denied
        )
    }
}

/// One job execution request with a human-governed lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub job_key: JobKey,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Address of the requesting party, for reply routing.
    pub requested_by_address: String,
    pub channel_id: String,
    pub conversation_id: String,
    /// Optimistic-concurrency token. Starts at 1; each successful
    /// transition increments it by exactly one.
    pub version: i64,
}

impl Run {
    /// Build a freshly created run in `AwaitingApproval` at version 1.
    pub fn new(
        run_id: RunId,
        job_key: JobKey,
        requested_by_address: impl Into<String>,
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            job_key,
            status: RunStatus::AwaitingApproval,
            created_at: at,
            updated_at: at,
            requested_by_address: requested_by_address.into(),
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            version: 1,
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
