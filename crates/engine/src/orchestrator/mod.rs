// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run orchestrator: single source of truth for run state.

mod inbound;
mod lifecycle;

use crate::error::EngineError;
use std::sync::Arc;
use textops_core::{Clock, ExecutionDispatch, OutboundMessage, RunId};
use textops_storage::{RunRepository, RunTimeline};

/// Effects of one orchestrator operation.
///
/// The orchestrator performs its own repository writes; everything else —
/// sending the outbound messages, enqueueing the dispatch — is the
/// caller's responsibility.
#[derive(Debug, Default)]
pub struct OrchestratorResult {
    pub run_id: Option<RunId>,
    /// Ordered replies to deliver.
    pub outbound: Vec<OutboundMessage>,
    pub dispatched_execution: bool,
    /// Present exactly when `dispatched_execution` is true; the caller
    /// must enqueue it.
    pub dispatch: Option<ExecutionDispatch>,
}

impl OrchestratorResult {
    /// Zero-effect result: duplicate deliveries and idempotent repeats.
    pub fn empty() -> Self {
        Self::default()
    }

    fn for_run(run_id: RunId, outbound: OutboundMessage) -> Self {
        Self {
            run_id: Some(run_id),
            outbound: vec![outbound],
            dispatched_execution: false,
            dispatch: None,
        }
    }

    fn reply_only(outbound: OutboundMessage) -> Self {
        Self {
            run_id: None,
            outbound: vec![outbound],
            dispatched_execution: false,
            dispatch: None,
        }
    }
}

/// Orchestrates run state transitions against the repository.
///
/// Stateless between calls: safe to share behind an `Arc` and invoke
/// concurrently. Competing commands are resolved by compare-and-swap in
/// the store, never by in-process locking.
pub struct Orchestrator<S, C> {
    store: Arc<S>,
    clock: C,
}

impl<S, C> Orchestrator<S, C>
where
    S: RunRepository,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self { store, clock }
    }

    /// The run and its ordered audit timeline.
    pub async fn get_timeline(&self, run_id_token: &str) -> Result<RunTimeline, EngineError> {
        let Ok(run_id) = RunId::parse(run_id_token) else {
            return Err(EngineError::RunNotFound(run_id_token.to_string()));
        };
        self.store
            .get_timeline(run_id)
            .await?
            .ok_or_else(|| EngineError::RunNotFound(run_id_token.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use textops_core::{FakeClock, InboundMessage};
    use textops_storage::MemoryStore;

    pub(crate) struct TestContext {
        pub store: Arc<MemoryStore>,
        pub clock: FakeClock,
        pub orchestrator: Arc<Orchestrator<MemoryStore, FakeClock>>,
    }

    pub(crate) fn setup() -> TestContext {
        let store = Arc::new(MemoryStore::new());
        let clock = FakeClock::new();
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), clock.clone()));
        TestContext { store, clock, orchestrator }
    }

    /// An inbound dev-channel message with a given provider message id.
    pub(crate) fn inbound(body: &str, provider_message_id: &str) -> InboundMessage {
        InboundMessage {
            channel_id: "dev".to_string(),
            provider_message_id: provider_message_id.to_string(),
            from_address: "dev:user1".to_string(),
            conversation_id: "dev:user1".to_string(),
            body: body.to_string(),
        }
    }
}
