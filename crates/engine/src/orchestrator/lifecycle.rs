// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution lifecycle callbacks from workers.
//!
//! Callbacks arrive at-least-once. First writer wins: a repeated or
//! late callback that lands on the state it already produced is an
//! idempotent no-op with zero outbound.

use super::{Orchestrator, OrchestratorResult};
use crate::error::EngineError;
use textops_core::{
    actor, Clock, NewRunEvent, OutboundMessage, RunEventKind, RunId, RunStatus, WorkerId,
};
use textops_storage::RunRepository;

impl<S, C> Orchestrator<S, C>
where
    S: RunRepository,
    C: Clock,
{
    /// A worker began executing the run: `Dispatching → Running`.
    pub async fn on_execution_started(
        &self,
        run_id: RunId,
        worker_id: &WorkerId,
    ) -> Result<OrchestratorResult, EngineError> {
        let Some(run) = self.store.get_run(run_id).await? else {
            return Ok(OrchestratorResult::reply_only(
                OutboundMessage::to_system_channel(
                    format!("Cannot start execution for unknown run {run_id}."),
                    format!("execution-started-unknown:{run_id}"),
                ),
            ));
        };

        let events = [NewRunEvent::new(
            RunEventKind::ExecutionStarted,
            self.clock.now_utc(),
            actor::worker(worker_id.as_str()),
            serde_json::json!({ "workerId": worker_id }),
        )];
        match self
            .store
            .try_update_run(run_id, RunStatus::Dispatching, RunStatus::Running, &events)
            .await?
        {
            Some(_) => {
                tracing::info!(run_id = %run_id, worker = %worker_id, "execution started");
                Ok(OrchestratorResult {
                    run_id: Some(run_id),
                    ..OrchestratorResult::empty()
                })
            }
            None => {
                let current = self
                    .store
                    .get_run_status(run_id)
                    .await?
                    .unwrap_or(run.status);
                if current == RunStatus::Running {
                    // A competing started callback already won.
                    return Ok(OrchestratorResult::empty());
                }
                tracing::warn!(run_id = %run_id, state = %current, "start callback in wrong state");
                Ok(OrchestratorResult::for_run(
                    run_id,
                    OutboundMessage::to_run_conversation(
                        &run.channel_id,
                        &run.conversation_id,
                        format!("Cannot start run {run_id} in state {current}."),
                        run_id,
                        format!("execution-started-conflict:{run_id}"),
                    ),
                ))
            }
        }
    }

    /// A worker finished executing the run: `Running → Succeeded|Failed`,
    /// with `Dispatching → Succeeded|Failed` accepted for the case where
    /// the started callback was lost.
    pub async fn on_execution_completed(
        &self,
        run_id: RunId,
        worker_id: &WorkerId,
        success: bool,
        summary: &str,
    ) -> Result<OrchestratorResult, EngineError> {
        let Some(run) = self.store.get_run(run_id).await? else {
            return Ok(OrchestratorResult::reply_only(
                OutboundMessage::to_system_channel(
                    format!("Cannot complete execution for unknown run {run_id}."),
                    format!("execution-completed-unknown:{run_id}"),
                ),
            ));
        };

        let (target, kind) = if success {
            (RunStatus::Succeeded, RunEventKind::ExecutionSucceeded)
        } else {
            (RunStatus::Failed, RunEventKind::ExecutionFailed)
        };
        let events = [NewRunEvent::new(
            kind,
            self.clock.now_utc(),
            actor::worker(worker_id.as_str()),
            serde_json::json!({ "workerId": worker_id, "summary": summary }),
        )];
        match self
            .store
            .try_update_run_from_multiple(
                run_id,
                &[RunStatus::Running, RunStatus::Dispatching],
                target,
                &events,
            )
            .await?
        {
            Some(_) => {
                tracing::info!(run_id = %run_id, worker = %worker_id, success, "execution completed");
                let verdict = if success { "succeeded" } else { "failed" };
                Ok(OrchestratorResult::for_run(
                    run_id,
                    OutboundMessage::to_run_conversation(
                        &run.channel_id,
                        &run.conversation_id,
                        format!("Run {run_id} {verdict}: {summary}"),
                        run_id,
                        format!("execution-completed:{run_id}"),
                    ),
                ))
            }
            None => {
                let current = self
                    .store
                    .get_run_status(run_id)
                    .await?
                    .unwrap_or(run.status);
                if current.is_terminal() {
                    // First completion won; this one is swallowed.
                    return Ok(OrchestratorResult::empty());
                }
                tracing::warn!(run_id = %run_id, state = %current, "completion callback in wrong state");
                Ok(OrchestratorResult::for_run(
                    run_id,
                    OutboundMessage::to_run_conversation(
                        &run.channel_id,
                        &run.conversation_id,
                        format!("Cannot complete run {run_id} in state {current}."),
                        run_id,
                        format!("execution-completed-conflict:{run_id}"),
                    ),
                ))
            }
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
