// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor plugin contract and the stub used by tests and the dev API.

use crate::error::ExecutorError;
use crate::orchestrator::{Orchestrator, OrchestratorResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use textops_core::{Clock, ExecutionDispatch, WorkerId};
use textops_storage::RunRepository;
use tokio_util::sync::CancellationToken;

/// The component that actually performs work for a dispatched run.
///
/// Contract: the plugin calls `on_execution_started` before doing work
/// and `on_execution_completed` afterwards; its return value is the
/// orchestrator's result from the completed callback. A job that ran and
/// reported failure still returns `Ok` — `Err` means the execution
/// machinery itself broke and the queue entry should be retried.
#[async_trait]
pub trait ExecutorPlugin: Send + Sync {
    async fn execute(
        &self,
        dispatch: &ExecutionDispatch,
        cancel: CancellationToken,
    ) -> Result<OrchestratorResult, ExecutorError>;
}

/// Simulated executor: sleeps 1000-2000ms, then succeeds unless the
/// lowercased job key contains `"fail"`.
pub struct StubExecutor<S, C> {
    orchestrator: Arc<Orchestrator<S, C>>,
    worker_id: WorkerId,
}

impl<S, C> StubExecutor<S, C> {
    pub fn new(orchestrator: Arc<Orchestrator<S, C>>, worker_id: WorkerId) -> Self {
        Self { orchestrator, worker_id }
    }
}

#[async_trait]
impl<S, C> ExecutorPlugin for StubExecutor<S, C>
where
    S: RunRepository + Send + Sync + 'static,
    C: Clock,
{
    async fn execute(
        &self,
        dispatch: &ExecutionDispatch,
        cancel: CancellationToken,
    ) -> Result<OrchestratorResult, ExecutorError> {
        self.orchestrator
            .on_execution_started(dispatch.run_id, &self.worker_id)
            .await?;

        // Jitter off UUID entropy keeps the simulated work in 1000-2000ms.
        let jitter_ms = uuid::Uuid::new_v4().as_bytes()[0] as u64 * 1000 / 255;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(1000 + jitter_ms)) => {}
            _ = cancel.cancelled() => return Err(ExecutorError::Canceled),
        }

        let job_key = dispatch.job_key.as_str();
        let success = !job_key.to_lowercase().contains("fail");
        let summary = if success {
            format!("Job '{job_key}' completed successfully")
        } else {
            format!("Job '{job_key}' failed (simulated failure)")
        };
        let result = self
            .orchestrator
            .on_execution_completed(dispatch.run_id, &self.worker_id, success, &summary)
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
