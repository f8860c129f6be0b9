// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence traits for runs and the execution queue.

use crate::error::StorageError;
use crate::types::{QueueEntry, RunTimeline};
use async_trait::async_trait;
use std::time::Duration;
use textops_core::{JobKey, NewRunEvent, Run, RunId, RunStatus, WorkerId};

/// Durable storage of runs, events, and the inbound dedup inbox.
///
/// Every operation is transactional. The orchestrator is the only writer;
/// its compare-and-swap transitions use the run's `version` column as the
/// optimistic-concurrency token, and events are appended inside the same
/// transaction as the transition that produced them.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Has `(channel_id, provider_message_id)` been processed already?
    async fn is_inbox_processed(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<bool, StorageError>;

    /// Record an inbound message as processed. A duplicate insert fails
    /// with [`StorageError::AlreadyProcessed`].
    async fn mark_inbox_processed(
        &self,
        channel_id: &str,
        provider_message_id: &str,
        run_id: Option<RunId>,
    ) -> Result<(), StorageError>;

    /// Insert a new run (version 1) and its creation events in one
    /// transaction. A run-id collision fails with
    /// [`StorageError::DuplicateRunId`].
    async fn create_run(&self, run: &Run, events: &[NewRunEvent]) -> Result<(), StorageError>;

    /// Compare-and-swap transition: if the run's current status equals
    /// `expected`, set `new_status`, bump `version`, touch `updated_at`,
    /// and append `events`, all in one transaction. Returns the updated
    /// run, or `None` (with zero side effects) on status mismatch or
    /// concurrency conflict.
    async fn try_update_run(
        &self,
        run_id: RunId,
        expected: RunStatus,
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError>;

    /// Same as [`try_update_run`](Self::try_update_run) but succeeds from
    /// any of the `expected` statuses.
    async fn try_update_run_from_multiple(
        &self,
        run_id: RunId,
        expected: &[RunStatus],
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError>;

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, StorageError>;

    /// The run plus its events sorted by `(at, id)`.
    async fn get_timeline(&self, run_id: RunId) -> Result<Option<RunTimeline>, StorageError>;

    async fn get_run_status(&self, run_id: RunId) -> Result<Option<RunStatus>, StorageError>;
}

/// Durable FIFO-ish dispatch queue. Entries are claimed by at most one
/// worker at a time; stale locks are reclaimed by a periodic sweep.
#[async_trait]
pub trait ExecutionQueue: Send + Sync {
    /// Idempotent on `run_id`: a no-op when a `pending` or `processing`
    /// entry for that run already exists.
    async fn enqueue(&self, run_id: RunId, job_key: &JobKey) -> Result<(), StorageError>;

    /// Atomically claim the oldest `pending` entry: transition it to
    /// `processing`, stamp the lock fields, increment `attempts`. Returns
    /// `None` when nothing is pending. Two concurrent callers never
    /// receive the same entry.
    async fn claim_next(&self, worker_id: &WorkerId) -> Result<Option<QueueEntry>, StorageError>;

    /// Transition `processing → completed|failed` and clear the lock.
    /// An unknown id logs a warning and is a no-op.
    async fn complete(
        &self,
        id: i64,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Transition `processing → pending` for a retry, clearing the lock
    /// but retaining `attempts`.
    async fn release(&self, id: i64, error: Option<&str>) -> Result<(), StorageError>;

    /// Return every `processing` entry whose lock is older than
    /// `lock_timeout` to `pending`. Returns the number reclaimed.
    async fn reclaim_stale(&self, lock_timeout: Duration) -> Result<u64, StorageError>;
}
