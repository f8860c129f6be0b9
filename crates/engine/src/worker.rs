// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker loop: claim queue entries, run the executor plugin, report the
//! outcome back to the queue.
//!
//! Each worker instance runs two tasks: the polling loop and a periodic
//! stale-lock reclaim sweep. Both stop cooperatively via a cancellation
//! token; cancellation mid-execution releases the claimed entry so
//! another worker can retry it.

use crate::error::ExecutorError;
use crate::executor::ExecutorPlugin;
use crate::outbound::OutboundSink;
use std::sync::Arc;
use std::time::Duration;
use textops_core::{ExecutionDispatch, WorkerId};
use textops_storage::{ExecutionQueue, QueueEntry};
use tokio_util::sync::CancellationToken;

/// Worker identity: `worker-{hostname}-{pid}` unless configured.
pub fn default_worker_id() -> WorkerId {
    let hostname = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string());
    WorkerId::new(format!("worker-{}-{}", hostname, std::process::id()))
}

/// Tunables for the polling and reclaim tasks.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: WorkerId,
    pub poll_interval: Duration,
    pub error_retry_delay: Duration,
    /// Claim budget per entry; the attempt that exceeds it fails the
    /// entry terminally.
    pub max_attempts: i64,
    pub lock_timeout: Duration,
    pub stale_check_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: default_worker_id(),
            poll_interval: Duration::from_secs(1),
            error_retry_delay: Duration::from_secs(5),
            max_attempts: 3,
            lock_timeout: Duration::from_secs(5 * 60),
            stale_check_interval: Duration::from_secs(60),
        }
    }
}

/// One worker instance bound to a queue and an executor plugin.
pub struct Worker<Q, E> {
    queue: Arc<Q>,
    executor: Arc<E>,
    sink: Arc<dyn OutboundSink>,
    config: WorkerConfig,
}

impl<Q, E> Worker<Q, E>
where
    Q: ExecutionQueue + 'static,
    E: ExecutorPlugin + 'static,
{
    pub fn new(
        queue: Arc<Q>,
        executor: Arc<E>,
        sink: Arc<dyn OutboundSink>,
        config: WorkerConfig,
    ) -> Self {
        Self { queue, executor, sink, config }
    }

    /// Polling task: claim → execute → complete/release, until canceled.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(worker = %self.config.worker_id, "worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.queue.claim_next(&self.config.worker_id).await {
                Ok(Some(entry)) => {
                    if self.process(entry, &cancel).await {
                        break;
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "claim failed");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.error_retry_delay) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }
        tracing::info!(worker = %self.config.worker_id, "worker stopped");
    }

    /// Reclaim task: periodically return stale `processing` locks to
    /// `pending` so entries from dead workers get retried.
    pub async fn run_reclaim(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.stale_check_interval) => {
                    if let Err(e) = self.queue.reclaim_stale(self.config.lock_timeout).await {
                        tracing::error!(error = %e, "stale lock reclaim failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    }

    /// Process one claimed entry. Returns true when shutdown interrupted
    /// the execution and the loop should exit.
    async fn process(&self, entry: QueueEntry, cancel: &CancellationToken) -> bool {
        tracing::info!(
            worker = %self.config.worker_id,
            run_id = %entry.run_id,
            job_key = %entry.job_key,
            attempt = entry.attempts,
            "processing queue entry"
        );
        let dispatch = ExecutionDispatch {
            run_id: entry.run_id,
            job_key: entry.job_key.clone(),
        };

        let outcome = tokio::select! {
            outcome = self.executor.execute(&dispatch, cancel.child_token()) => outcome,
            _ = cancel.cancelled() => Err(ExecutorError::Canceled),
        };

        match outcome {
            Ok(result) => {
                for message in &result.outbound {
                    self.sink.deliver(message);
                }
                if let Err(e) = self.queue.complete(entry.id, true, None).await {
                    tracing::error!(id = entry.id, error = %e, "complete failed");
                }
                false
            }
            Err(ExecutorError::Canceled) => {
                tracing::info!(id = entry.id, "shutdown during execution, releasing entry");
                if let Err(e) = self.queue.release(entry.id, Some("shutdown")).await {
                    tracing::error!(id = entry.id, error = %e, "release failed");
                }
                true
            }
            Err(e) => {
                let error = e.to_string();
                if entry.attempts < self.config.max_attempts {
                    tracing::warn!(
                        id = entry.id,
                        attempt = entry.attempts,
                        error = %error,
                        "executor error, releasing for retry"
                    );
                    if let Err(e) = self.queue.release(entry.id, Some(&error)).await {
                        tracing::error!(id = entry.id, error = %e, "release failed");
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.error_retry_delay) => {}
                        _ = cancel.cancelled() => return true,
                    }
                } else {
                    tracing::error!(
                        id = entry.id,
                        attempts = entry.attempts,
                        error = %error,
                        "attempts exhausted, failing entry"
                    );
                    if let Err(e) = self.queue.complete(entry.id, false, Some(&error)).await {
                        tracing::error!(id = entry.id, error = %e, "complete failed");
                    }
                }
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
