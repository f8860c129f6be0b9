// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Anything user-caused (bad command, unknown run, invalid transition)
//! never appears here: those are reported in-band as outbound messages.
//! These errors are infrastructure failures and programming-contract
//! breaches only.

use textops_storage::StorageError;

/// Failures from orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Timeline lookup for a run that does not exist.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// Two consecutive run-id collisions. With a 16.7M id space this
    /// indicates a broken random source, not bad luck.
    #[error("run id space exhausted after regeneration")]
    IdSpaceExhausted,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures from an executor plugin.
///
/// A job that *ran and failed* is not an error: the plugin reports that
/// through `on_execution_completed(success = false)` and returns `Ok`.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Cooperative shutdown fired mid-execution.
    #[error("execution canceled")]
    Canceled,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("executor failure: {0}")]
    Other(String),
}
