// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! textops-storage: durable state for runs, events, inbox, and the
//! execution queue.
//!
//! The orchestrator and workers operate exclusively through the
//! [`RunRepository`] and [`ExecutionQueue`] traits, enabling pluggable
//! backends: an in-memory store for unit tests and ephemeral dev runs,
//! SQLite for the single-node default, Postgres for row-locked claims.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod sqlite;
pub mod types;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::{ExecutionQueue, RunRepository};
pub use sqlite::SqliteStore;
pub use types::{QueueEntry, QueueEntryStatus, RunTimeline};
