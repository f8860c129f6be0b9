// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite backend: the single-node default.
//!
//! SQLite has no `FOR UPDATE SKIP LOCKED`, so the claim path is a single
//! row-conditional `UPDATE ... RETURNING` statement; the database's
//! single-writer discipline makes it atomic. Compare-and-swap transitions
//! check the affected-row count inside an explicit transaction.

use crate::error::StorageError;
use crate::repository::{ExecutionQueue, RunRepository};
use crate::types::{QueueEntry, QueueEntryStatus, RunTimeline};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use textops_core::{JobKey, NewRunEvent, Run, RunEvent, RunId, RunStatus, WorkerId};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS runs (
        run_id TEXT PRIMARY KEY,
        job_key TEXT NOT NULL,
        status INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        requested_by_address TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        conversation_id TEXT NOT NULL,
        version INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status)",
    "CREATE INDEX IF NOT EXISTS idx_runs_channel_conversation
        ON runs(channel_id, conversation_id)",
    "CREATE TABLE IF NOT EXISTS run_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL,
        type TEXT NOT NULL,
        at TEXT NOT NULL,
        actor TEXT NOT NULL,
        payload TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_run_events_run ON run_events(run_id)",
    "CREATE TABLE IF NOT EXISTS inbox (
        channel_id TEXT NOT NULL,
        provider_message_id TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        run_id TEXT,
        PRIMARY KEY (channel_id, provider_message_id)
    )",
    "CREATE TABLE IF NOT EXISTS queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL,
        job_key TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        locked_at TEXT,
        locked_by TEXT,
        attempts INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        completed_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_queue_status ON queue(status)",
    "CREATE INDEX IF NOT EXISTS idx_queue_status_locked_at ON queue(status, locked_at)",
];

/// SQLite implementation of both storage traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating the file and schema if needed) from a connection
    /// string like `sqlite:textops.db`.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Age an entry's lock so stale-lock reclamation can be exercised
    /// without sleeping.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn backdate_lock(&self, id: i64, by: Duration) -> Result<(), StorageError> {
        let delta = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        let row = sqlx::query("SELECT locked_at FROM queue WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(()) };
        let locked_at: Option<DateTime<Utc>> = row.try_get("locked_at")?;
        if let Some(locked_at) = locked_at {
            sqlx::query("UPDATE queue SET locked_at = ?1 WHERE id = ?2")
                .bind(locked_at - delta)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Snapshot of every queue entry, for test assertions.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn queue_snapshot(&self) -> Result<Vec<QueueEntry>, StorageError> {
        let rows = sqlx::query("SELECT * FROM queue ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    fn transition_time(events: &[NewRunEvent]) -> DateTime<Utc> {
        events.last().map(|e| e.at).unwrap_or_else(Utc::now)
    }

    async fn cas(
        &self,
        run_id: RunId,
        expected: &[RunStatus],
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError> {
        // Status codes come from a closed enum, safe to inline.
        let codes = expected
            .iter()
            .map(|s| s.code().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE runs SET status = ?1, version = version + 1, updated_at = ?2
             WHERE run_id = ?3 AND status IN ({codes})"
        );
        let result = sqlx::query(&sql)
            .bind(new_status.code())
            .bind(Self::transition_time(events))
            .bind(run_id.as_str())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }
        for event in events {
            sqlx::query(
                "INSERT INTO run_events (run_id, type, at, actor, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(run_id.as_str())
            .bind(event.kind.as_str())
            .bind(event.at)
            .bind(&event.actor)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await?;
        }
        let row = sqlx::query("SELECT * FROM runs WHERE run_id = ?1")
            .bind(run_id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let run = run_from_row(&row)?;
        tx.commit().await?;
        Ok(Some(run))
    }
}

fn run_from_row(row: &SqliteRow) -> Result<Run, StorageError> {
    let run_id: String = row.try_get("run_id")?;
    let job_key: String = row.try_get("job_key")?;
    let status: i64 = row.try_get("status")?;
    Ok(Run {
        run_id: RunId::parse(&run_id)
            .map_err(|e| StorageError::Corrupt(format!("bad run_id: {e}")))?,
        job_key: JobKey::new(job_key)
            .map_err(|e| StorageError::Corrupt(format!("bad job_key: {e}")))?,
        status: RunStatus::from_code(status)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown status code {status}")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        requested_by_address: row.try_get("requested_by_address")?,
        channel_id: row.try_get("channel_id")?,
        conversation_id: row.try_get("conversation_id")?,
        version: row.try_get("version")?,
    })
}

fn event_from_row(row: &SqliteRow) -> Result<RunEvent, StorageError> {
    let run_id: String = row.try_get("run_id")?;
    let kind: String = row.try_get("type")?;
    Ok(RunEvent {
        id: row.try_get("id")?,
        run_id: RunId::parse(&run_id)
            .map_err(|e| StorageError::Corrupt(format!("bad run_id: {e}")))?,
        kind: textops_core::RunEventKind::parse(&kind)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown event type {kind:?}")))?,
        at: row.try_get("at")?,
        actor: row.try_get("actor")?,
        payload: row.try_get("payload")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<QueueEntry, StorageError> {
    let run_id: String = row.try_get("run_id")?;
    let job_key: String = row.try_get("job_key")?;
    let status: String = row.try_get("status")?;
    let locked_by: Option<String> = row.try_get("locked_by")?;
    Ok(QueueEntry {
        id: row.try_get("id")?,
        run_id: RunId::parse(&run_id)
            .map_err(|e| StorageError::Corrupt(format!("bad run_id: {e}")))?,
        job_key: JobKey::new(job_key)
            .map_err(|e| StorageError::Corrupt(format!("bad job_key: {e}")))?,
        status: QueueEntryStatus::parse(&status)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown queue status {status:?}")))?,
        created_at: row.try_get("created_at")?,
        locked_at: row.try_get("locked_at")?,
        locked_by: locked_by.map(WorkerId::new),
        attempts: row.try_get("attempts")?,
        last_error: row.try_get("last_error")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl RunRepository for SqliteStore {
    async fn is_inbox_processed(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM inbox WHERE channel_id = ?1 AND provider_message_id = ?2",
        )
        .bind(channel_id)
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn mark_inbox_processed(
        &self,
        channel_id: &str,
        provider_message_id: &str,
        run_id: Option<RunId>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "INSERT INTO inbox (channel_id, provider_message_id, processed_at, run_id)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(channel_id)
        .bind(provider_message_id)
        .bind(Utc::now())
        .bind(run_id.map(|r| r.to_string()))
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StorageError::AlreadyProcessed {
                channel_id: channel_id.to_string(),
                provider_message_id: provider_message_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_run(&self, run: &Run, events: &[NewRunEvent]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO runs (run_id, job_key, status, created_at, updated_at,
                               requested_by_address, channel_id, conversation_id, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(run.run_id.as_str())
        .bind(run.job_key.as_str())
        .bind(run.status.code())
        .bind(run.created_at)
        .bind(run.updated_at)
        .bind(&run.requested_by_address)
        .bind(&run.channel_id)
        .bind(&run.conversation_id)
        .bind(run.version)
        .execute(&mut *tx)
        .await;
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::DuplicateRunId(run.run_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        for event in events {
            sqlx::query(
                "INSERT INTO run_events (run_id, type, at, actor, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(run.run_id.as_str())
            .bind(event.kind.as_str())
            .bind(event.at)
            .bind(&event.actor)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn try_update_run(
        &self,
        run_id: RunId,
        expected: RunStatus,
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError> {
        self.cas(run_id, &[expected], new_status, events).await
    }

    async fn try_update_run_from_multiple(
        &self,
        run_id: RunId,
        expected: &[RunStatus],
        new_status: RunStatus,
        events: &[NewRunEvent],
    ) -> Result<Option<Run>, StorageError> {
        self.cas(run_id, expected, new_status, events).await
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, StorageError> {
        let row = sqlx::query("SELECT * FROM runs WHERE run_id = ?1")
            .bind(run_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| run_from_row(&r)).transpose()
    }

    async fn get_timeline(&self, run_id: RunId) -> Result<Option<RunTimeline>, StorageError> {
        let Some(run) = self.get_run(run_id).await? else {
            return Ok(None);
        };
        let rows = sqlx::query(
            "SELECT * FROM run_events WHERE run_id = ?1 ORDER BY at ASC, id ASC",
        )
        .bind(run_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        let events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(RunTimeline { run, events }))
    }

    async fn get_run_status(&self, run_id: RunId) -> Result<Option<RunStatus>, StorageError> {
        let row = sqlx::query("SELECT status FROM runs WHERE run_id = ?1")
            .bind(run_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let code: i64 = row.try_get("status")?;
        RunStatus::from_code(code)
            .map(Some)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown status code {code}")))
    }
}

#[async_trait]
impl ExecutionQueue for SqliteStore {
    async fn enqueue(&self, run_id: RunId, job_key: &JobKey) -> Result<(), StorageError> {
        let result = sqlx::query(
            "INSERT INTO queue (run_id, job_key, status, created_at, attempts)
             SELECT ?1, ?2, 'pending', ?3, 0
             WHERE NOT EXISTS (
                 SELECT 1 FROM queue
                 WHERE run_id = ?1 AND status IN ('pending', 'processing')
             )",
        )
        .bind(run_id.as_str())
        .bind(job_key.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            tracing::debug!(run_id = %run_id, "enqueue: entry already live, skipping");
        }
        Ok(())
    }

    async fn claim_next(&self, worker_id: &WorkerId) -> Result<Option<QueueEntry>, StorageError> {
        // Single statement: atomic under SQLite's single-writer model.
        let row = sqlx::query(
            "UPDATE queue
             SET status = 'processing', locked_at = ?1, locked_by = ?2,
                 attempts = attempts + 1
             WHERE id = (
                 SELECT id FROM queue WHERE status = 'pending' ORDER BY id ASC LIMIT 1
             ) AND status = 'pending'
             RETURNING *",
        )
        .bind(Utc::now())
        .bind(worker_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| entry_from_row(&r)).transpose()
    }

    async fn complete(
        &self,
        id: i64,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), StorageError> {
        let status = if success { "completed" } else { "failed" };
        let result = sqlx::query(
            "UPDATE queue
             SET status = ?1, completed_at = ?2, locked_at = NULL, locked_by = NULL,
                 last_error = COALESCE(?3, last_error)
             WHERE id = ?4 AND status = 'processing'",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            tracing::warn!(id, "complete: queue entry unknown or not processing");
        }
        Ok(())
    }

    async fn release(&self, id: i64, error: Option<&str>) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE queue
             SET status = 'pending', locked_at = NULL, locked_by = NULL,
                 last_error = COALESCE(?1, last_error)
             WHERE id = ?2 AND status = 'processing'",
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            tracing::warn!(id, "release: queue entry unknown or not processing");
        }
        Ok(())
    }

    async fn reclaim_stale(&self, lock_timeout: Duration) -> Result<u64, StorageError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(lock_timeout).unwrap_or_else(|_| chrono::Duration::zero());
        let result = sqlx::query(
            "UPDATE queue
             SET status = 'pending', locked_at = NULL, locked_by = NULL
             WHERE status = 'processing' AND locked_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        let reclaimed = result.rows_affected();
        if reclaimed > 0 {
            tracing::info!(reclaimed, "reclaimed stale queue locks");
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
