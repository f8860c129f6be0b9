// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store: a mutex around plain maps, with the same
//! compare-and-swap semantics as the SQL backends.
//!
//! Used by unit tests and available as a provider for ephemeral dev runs.
//! The integer `version` token makes CAS conflicts observable exactly as
//! they are under a real database.

use crate::error::StorageError;
use crate::repository::{ExecutionQueue, RunRepository};
use crate::types::{QueueEntry, QueueEntryStatus, RunTimeline};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use textops_core::{JobKey, NewRunEvent, Run, RunEvent, RunId, RunStatus, WorkerId};

#[derive(Default)]
struct Inner {
    runs: HashMap<RunId, Run>,
    events: HashMap<RunId, Vec<RunEvent>>,
    next_event_id: i64,
    /// `(channel_id, provider_message_id)` → associated run, if any.
    inbox: HashMap<(String, String), Option<RunId>>,
    queue: Vec<QueueEntry>,
    next_queue_id: i64,
}

/// In-memory implementation of both storage traits.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// Age an entry's lock so stale-lock reclamation can be exercised
    /// without sleeping.
    #[cfg(any(test, feature = "test-support"))]
    pub fn backdate_lock(&self, id: i64, by: Duration) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.queue.iter_mut().find(|e| e.id == id) {
            if let Some(locked_at) = entry.locked_at.as_mut() {
                *locked_at -= chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
            }
        }
    }

    /// Snapshot of every queue entry, for test assertions.
    #[cfg(any(test, feature = "test-support"))]
    pub fn queue_snapshot(&self) -> Vec<QueueEntry> {
        self.inner.lock().queue.clone()
    }

    /// Timestamp for a transition: the time of the event that produced
    /// it, falling back to wall time for event-less writes.
    fn transition_time(events: &[NewRunEvent]) -> DateTime<Utc> {
        events.last().map(|e| e.at).unwrap_or_else(Utc::now)
    }

    fn append_events(inner: &mut Inner, run_id: RunId, events: &[NewRunEvent]) {
        for event in events {
            inner.next_event_id += 1;
            let id = inner.next_event_id;
            inner.events.entry(run_id).or_default().push(RunEvent {
                id,
                run_id,
                kind: event.kind,
                at: event.at,
                actor: event.actor.clone(),
                payload: event.payload.clone(),
            });
        }
    }

    fn cas(
        &self,
        run_id: RunId,
        expected: &[RunStatus],
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError> {
        let mut inner = self.inner.lock();
        let Some(run) = inner.runs.get_mut(&run_id) else {
            return Ok(None);
        };
        if !expected.contains(&run.status) {
            return Ok(None);
        }
        run.status = new_status;
        run.version += 1;
        run.updated_at = Self::transition_time(events);
        let updated = run.clone();
        Self::append_events(&mut inner, run_id, events);
        Ok(Some(updated))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunRepository for MemoryStore {
    async fn is_inbox_processed(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<bool, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .inbox
            .contains_key(&(channel_id.to_string(), provider_message_id.to_string())))
    }

    async fn mark_inbox_processed(
        &self,
        channel_id: &str,
        provider_message_id: &str,
        run_id: Option<RunId>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let key = (channel_id.to_string(), provider_message_id.to_string());
        if inner.inbox.contains_key(&key) {
            return Err(StorageError::AlreadyProcessed {
                channel_id: channel_id.to_string(),
                provider_message_id: provider_message_id.to_string(),
            });
        }
        inner.inbox.insert(key, run_id);
        Ok(())
    }

    async fn create_run(&self, run: &Run, events: &[NewRunEvent]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if inner.runs.contains_key(&run.run_id) {
            return Err(StorageError::DuplicateRunId(run.run_id.to_string()));
        }
        inner.runs.insert(run.run_id, run.clone());
        Self::append_events(&mut inner, run.run_id, events);
        Ok(())
    }

    async fn try_update_run(
        &self,
        run_id: RunId,
        expected: RunStatus,
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError> {
        self.cas(run_id, &[expected], new_status, events)
    }

    async fn try_update_run_from_multiple(
        &self,
        run_id: RunId,
        expected: &[RunStatus],
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError> {
        self.cas(run_id, expected, new_status, events)
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, StorageError> {
        Ok(self.inner.lock().runs.get(&run_id).cloned())
    }

    async fn get_timeline(&self, run_id: RunId) -> Result<Option<RunTimeline>, StorageError> {
        let inner = self.inner.lock();
        let Some(run) = inner.runs.get(&run_id).cloned() else {
            return Ok(None);
        };
        let mut events = inner.events.get(&run_id).cloned().unwrap_or_default();
        events.sort_by_key(|e| (e.at, e.id));
        Ok(Some(RunTimeline { run, events }))
    }

    async fn get_run_status(&self, run_id: RunId) -> Result<Option<RunStatus>, StorageError> {
        Ok(self.inner.lock().runs.get(&run_id).map(|r| r.status))
    }
}

#[async_trait]
impl ExecutionQueue for MemoryStore {
    async fn enqueue(&self, run_id: RunId, job_key: &JobKey) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let live = inner.queue.iter().any(|e| {
            e.run_id == run_id
                && matches!(
                    e.status,
                    QueueEntryStatus::Pending | QueueEntryStatus::Processing
                )
        });
        if live {
            tracing::debug!(run_id = %run_id, "enqueue: entry already live, skipping");
            return Ok(());
        }
        inner.next_queue_id += 1;
        let id = inner.next_queue_id;
        inner.queue.push(QueueEntry {
            id,
            run_id,
            job_key: job_key.clone(),
            status: QueueEntryStatus::Pending,
            created_at: Utc::now(),
            locked_at: None,
            locked_by: None,
            attempts: 0,
            last_error: None,
            completed_at: None,
        });
        Ok(())
    }

    async fn claim_next(&self, worker_id: &WorkerId) -> Result<Option<QueueEntry>, StorageError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner
            .queue
            .iter_mut()
            .filter(|e| e.status == QueueEntryStatus::Pending)
            .min_by_key(|e| e.id)
        else {
            return Ok(None);
        };
        entry.status = QueueEntryStatus::Processing;
        entry.locked_at = Some(Utc::now());
        entry.locked_by = Some(worker_id.clone());
        entry.attempts += 1;
        Ok(Some(entry.clone()))
    }

    async fn complete(
        &self,
        id: i64,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.queue.iter_mut().find(|e| e.id == id) else {
            tracing::warn!(id, "complete: unknown queue entry");
            return Ok(());
        };
        if entry.status != QueueEntryStatus::Processing {
            tracing::warn!(id, status = %entry.status, "complete: entry not processing");
            return Ok(());
        }
        entry.status = if success {
            QueueEntryStatus::Completed
        } else {
            QueueEntryStatus::Failed
        };
        entry.completed_at = Some(Utc::now());
        entry.locked_at = None;
        entry.locked_by = None;
        if let Some(error) = error {
            entry.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn release(&self, id: i64, error: Option<&str>) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.queue.iter_mut().find(|e| e.id == id) else {
            tracing::warn!(id, "release: unknown queue entry");
            return Ok(());
        };
        if entry.status != QueueEntryStatus::Processing {
            tracing::warn!(id, status = %entry.status, "release: entry not processing");
            return Ok(());
        }
        entry.status = QueueEntryStatus::Pending;
        entry.locked_at = None;
        entry.locked_by = None;
        if let Some(error) = error {
            entry.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn reclaim_stale(&self, lock_timeout: Duration) -> Result<u64, StorageError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(lock_timeout).unwrap_or_else(|_| chrono::Duration::zero());
        let mut inner = self.inner.lock();
        let mut reclaimed = 0;
        for entry in inner.queue.iter_mut() {
            if entry.status == QueueEntryStatus::Processing
                && entry.locked_at.map(|at| at < cutoff).unwrap_or(false)
            {
                entry.status = QueueEntryStatus::Pending;
                entry.locked_at = None;
                entry.locked_by = None;
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            tracing::info!(reclaimed, "reclaimed stale queue locks");
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
