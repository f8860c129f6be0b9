// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message handling: dedup, intent routing, state transitions.

use super::{Orchestrator, OrchestratorResult};
use crate::error::EngineError;
use textops_core::{
    actor, Clock, ExecutionDispatch, InboundMessage, Intent, JobKey, NewRunEvent,
    OutboundMessage, ParsedIntent, Run, RunEventKind, RunId, RunStatus,
};
use textops_storage::{RunRepository, StorageError};

const HELP_BODY: &str = "Commands: run <jobKey>, yes <runId>, no <runId>, status <runId>";

impl<S, C> Orchestrator<S, C>
where
    S: RunRepository,
    C: Clock,
{
    /// Process one inbound message.
    ///
    /// The inbox check is the first side-effect gate: a duplicate
    /// `(channel_id, provider_message_id)` yields an empty result with no
    /// state change and no outbound. Every non-duplicate inbound —
    /// including Status and Unknown — records an inbox entry before its
    /// intent takes effect, so redelivery after any partial failure can
    /// never re-apply a side effect.
    pub async fn handle_inbound(
        &self,
        message: &InboundMessage,
        parsed: &ParsedIntent,
    ) -> Result<OrchestratorResult, EngineError> {
        if self
            .store
            .is_inbox_processed(&message.channel_id, &message.provider_message_id)
            .await?
        {
            tracing::debug!(
                channel = %message.channel_id,
                provider_message_id = %message.provider_message_id,
                "duplicate inbound, skipping"
            );
            return Ok(OrchestratorResult::empty());
        }

        match &parsed.intent {
            Intent::RunJob { job_key: None } => self.handle_run_missing_key(message).await,
            Intent::RunJob { job_key: Some(job_key) } => {
                self.handle_run(message, job_key).await
            }
            Intent::ApproveRun { run_id } => self.handle_approve(message, run_id).await,
            Intent::DenyRun { run_id } => self.handle_deny(message, run_id).await,
            Intent::Status { run_id } => self.handle_status(message, run_id).await,
            Intent::Unknown => self.handle_unknown(message).await,
        }
    }

    /// Record the inbox entry for this message. Returns false when a
    /// concurrent delivery of the same message won the race, in which
    /// case the caller must produce zero effects.
    async fn mark_inbox(
        &self,
        message: &InboundMessage,
        run_id: Option<RunId>,
    ) -> Result<bool, EngineError> {
        match self
            .store
            .mark_inbox_processed(&message.channel_id, &message.provider_message_id, run_id)
            .await
        {
            Ok(()) => Ok(true),
            Err(StorageError::AlreadyProcessed { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_run_missing_key(
        &self,
        message: &InboundMessage,
    ) -> Result<OrchestratorResult, EngineError> {
        if !self.mark_inbox(message, None).await? {
            return Ok(OrchestratorResult::empty());
        }
        Ok(OrchestratorResult::reply_only(OutboundMessage::reply_to(
            message,
            "Missing job key. Usage: run <jobKey>",
        )))
    }

    async fn handle_unknown(
        &self,
        message: &InboundMessage,
    ) -> Result<OrchestratorResult, EngineError> {
        if !self.mark_inbox(message, None).await? {
            return Ok(OrchestratorResult::empty());
        }
        Ok(OrchestratorResult::reply_only(OutboundMessage::reply_to(
            message, HELP_BODY,
        )))
    }

    async fn handle_run(
        &self,
        message: &InboundMessage,
        job_key: &JobKey,
    ) -> Result<OrchestratorResult, EngineError> {
        let mut run_id = RunId::generate();
        // Inbox first: the association is advisory and may name the
        // pre-collision id.
        if !self.mark_inbox(message, Some(run_id)).await? {
            return Ok(OrchestratorResult::empty());
        }

        match self.create_run_once(message, job_key, run_id).await {
            Ok(()) => {}
            Err(StorageError::DuplicateRunId(collided)) => {
                tracing::warn!(run_id = %collided, "run id collision, regenerating");
                run_id = RunId::generate();
                match self.create_run_once(message, job_key, run_id).await {
                    Ok(()) => {}
                    Err(StorageError::DuplicateRunId(_)) => {
                        return Err(EngineError::IdSpaceExhausted);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(run_id = %run_id, job_key = %job_key, "run created, awaiting approval");
        let body = format!(
            "Job \"{job_key}\" is ready. Reply YES {run_id} to approve or NO {run_id} to deny."
        );
        Ok(OrchestratorResult::for_run(
            run_id,
            OutboundMessage::to_run_conversation(
                &message.channel_id,
                &message.conversation_id,
                body,
                run_id,
                format!("approval-request:{run_id}"),
            ),
        ))
    }

    async fn create_run_once(
        &self,
        message: &InboundMessage,
        job_key: &JobKey,
        run_id: RunId,
    ) -> Result<(), StorageError> {
        let now = self.clock.now_utc();
        let run = Run::new(
            run_id,
            job_key.clone(),
            &message.from_address,
            &message.channel_id,
            &message.conversation_id,
            now,
        );
        let events = [
            NewRunEvent::new(
                RunEventKind::RunCreated,
                now,
                actor::user(&message.from_address),
                serde_json::json!({ "jobKey": job_key }),
            ),
            NewRunEvent::new(
                RunEventKind::ApprovalRequested,
                now,
                actor::SYSTEM,
                serde_json::json!({ "policy": "DefaultRequireApproval" }),
            ),
        ];
        self.store.create_run(&run, &events).await
    }

    async fn handle_approve(
        &self,
        message: &InboundMessage,
        token: &str,
    ) -> Result<OrchestratorResult, EngineError> {
        let run_id = RunId::parse(token).ok();
        if !self.mark_inbox(message, run_id).await? {
            return Ok(OrchestratorResult::empty());
        }
        let Some(run) = self.lookup(run_id).await? else {
            return Ok(unknown_run_reply(message, token));
        };

        let now = self.clock.now_utc();
        let events = [
            NewRunEvent::new(
                RunEventKind::RunApproved,
                now,
                actor::user(&message.from_address),
                serde_json::json!({}),
            ),
            NewRunEvent::new(
                RunEventKind::ExecutionDispatched,
                now,
                actor::SYSTEM,
                serde_json::json!({ "jobKey": run.job_key }),
            ),
        ];
        match self
            .store
            .try_update_run(
                run.run_id,
                RunStatus::AwaitingApproval,
                RunStatus::Dispatching,
                &events,
            )
            .await?
        {
            Some(updated) => {
                tracing::info!(run_id = %run.run_id, job_key = %updated.job_key, "run approved, dispatching");
                let body = format!(
                    "Approved. Starting run {} for job \"{}\"\u{2026}",
                    run.run_id, updated.job_key
                );
                Ok(OrchestratorResult {
                    run_id: Some(run.run_id),
                    outbound: vec![OutboundMessage::to_run_conversation(
                        &run.channel_id,
                        &run.conversation_id,
                        body,
                        run.run_id,
                        format!("approved-starting:{}", run.run_id),
                    )],
                    dispatched_execution: true,
                    dispatch: Some(ExecutionDispatch {
                        run_id: run.run_id,
                        job_key: updated.job_key,
                    }),
                })
            }
            None => self.transition_conflict(message, &run, "approve").await,
        }
    }

    async fn handle_deny(
        &self,
        message: &InboundMessage,
        token: &str,
    ) -> Result<OrchestratorResult, EngineError> {
        let run_id = RunId::parse(token).ok();
        if !self.mark_inbox(message, run_id).await? {
            return Ok(OrchestratorResult::empty());
        }
        let Some(run) = self.lookup(run_id).await? else {
            return Ok(unknown_run_reply(message, token));
        };

        let events = [NewRunEvent::new(
            RunEventKind::RunDenied,
            self.clock.now_utc(),
            actor::user(&message.from_address),
            serde_json::json!({}),
        )];
        match self
            .store
            .try_update_run(
                run.run_id,
                RunStatus::AwaitingApproval,
                RunStatus::Denied,
                &events,
            )
            .await?
        {
            Some(updated) => {
                tracing::info!(run_id = %run.run_id, "run denied");
                let body = format!(
                    "Denied run {} for job \"{}\".",
                    run.run_id, updated.job_key
                );
                Ok(OrchestratorResult::for_run(
                    run.run_id,
                    OutboundMessage::to_run_conversation(
                        &run.channel_id,
                        &run.conversation_id,
                        body,
                        run.run_id,
                        format!("denied:{}", run.run_id),
                    ),
                ))
            }
            None => self.transition_conflict(message, &run, "deny").await,
        }
    }

    async fn handle_status(
        &self,
        message: &InboundMessage,
        token: &str,
    ) -> Result<OrchestratorResult, EngineError> {
        let run_id = RunId::parse(token).ok();
        if !self.mark_inbox(message, run_id).await? {
            return Ok(OrchestratorResult::empty());
        }
        let Some(run) = self.lookup(run_id).await? else {
            return Ok(unknown_run_reply(message, token));
        };

        let body = format!(
            "Run {}\nJob: {}\nState: {}\nCreated: {}",
            run.run_id,
            run.job_key,
            run.status,
            run.created_at.to_rfc3339(),
        );
        Ok(OrchestratorResult::for_run(
            run.run_id,
            OutboundMessage::to_run_conversation(
                &run.channel_id,
                &run.conversation_id,
                body,
                run.run_id,
                format!(
                    "reply:{}:{}",
                    message.channel_id, message.provider_message_id
                ),
            ),
        ))
    }

    async fn lookup(&self, run_id: Option<RunId>) -> Result<Option<Run>, EngineError> {
        match run_id {
            Some(run_id) => Ok(self.store.get_run(run_id).await?),
            None => Ok(None),
        }
    }

    /// A compare-and-swap transition lost to a competing command. The
    /// inbox entry is already recorded; re-read the current state once
    /// and describe the mismatch.
    async fn transition_conflict(
        &self,
        message: &InboundMessage,
        run: &Run,
        verb: &str,
    ) -> Result<OrchestratorResult, EngineError> {
        let current = self
            .store
            .get_run_status(run.run_id)
            .await?
            .unwrap_or(run.status);
        tracing::info!(run_id = %run.run_id, state = %current, "cannot {verb} in current state");
        let body = format!("Cannot {verb} run {} in state {current}.", run.run_id);
        Ok(OrchestratorResult::for_run(
            run.run_id,
            OutboundMessage::to_run_conversation(
                &run.channel_id,
                &run.conversation_id,
                body,
                run.run_id,
                format!(
                    "reply:{}:{}",
                    message.channel_id, message.provider_message_id
                ),
            ),
        ))
    }
}

fn unknown_run_reply(message: &InboundMessage, token: &str) -> OrchestratorResult {
    OrchestratorResult::reply_only(OutboundMessage::reply_to(
        message,
        format!("Unknown run id: {token}"),
    ))
}

#[cfg(test)]
#[path = "inbound_tests.rs"]
mod tests;
