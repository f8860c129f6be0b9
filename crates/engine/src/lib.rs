// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! textops-engine: the run orchestration state machine and the worker
//! loop that drains the execution queue.
//!
//! The orchestrator is the single owner of run state. It is stateless
//! between calls; every mutation is a compare-and-swap transition in the
//! repository with audit events appended in the same operation, so it is
//! safe to invoke concurrently from many callers.

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod outbound;
pub mod worker;

pub use error::{EngineError, ExecutorError};
pub use executor::{ExecutorPlugin, StubExecutor};
pub use orchestrator::{Orchestrator, OrchestratorResult};
pub use outbound::{OutboundSink, StderrSink};
pub use worker::{default_worker_id, Worker, WorkerConfig};
