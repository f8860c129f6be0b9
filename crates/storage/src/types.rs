// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stored record types shared by all backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use textops_core::{JobKey, Run, RunEvent, RunId, WorkerId};

/// Status of an execution queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEntryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

textops_core::simple_display! {
    QueueEntryStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl QueueEntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueEntryStatus::Pending => "pending",
            QueueEntryStatus::Processing => "processing",
            QueueEntryStatus::Completed => "completed",
            QueueEntryStatus::Failed => "failed",
        }
    }

    /// Decode the persisted status string.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => QueueEntryStatus::Pending,
            "processing" => QueueEntryStatus::Processing,
            "completed" => QueueEntryStatus::Completed,
            "failed" => QueueEntryStatus::Failed,
            _ => return None,
        })
    }
}

/// One execution dispatch record. Created on approval; mutated only by
/// workers via atomic claim/release/complete; never deleted in normal
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub run_id: RunId,
    pub job_key: JobKey,
    pub status: QueueEntryStatus,
    pub created_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<WorkerId>,
    /// Claim count. Incremented on every claim, including reclaims after a
    /// stale lock, so retry budgets survive worker death.
    pub attempts: i64,
    pub last_error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A run together with its full audit timeline, ordered by `(at, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTimeline {
    pub run: Run,
    pub events: Vec<RunEvent>,
}
