// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error taxonomy.

/// Errors surfaced by repository and queue operations.
///
/// Duplicate conditions get their own variants because callers branch on
/// them: an `AlreadyProcessed` inbox insert means "swallow the message",
/// a `DuplicateRunId` means "regenerate the id once".
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The `(channel_id, provider_message_id)` pair was already marked.
    #[error("inbox entry already processed: {channel_id}/{provider_message_id}")]
    AlreadyProcessed {
        channel_id: String,
        provider_message_id: String,
    },

    /// Insert-time primary-key collision on the runs table.
    #[error("run id collision: {0}")]
    DuplicateRunId(String),

    /// A persisted value failed to decode (unknown status code, bad
    /// timestamp, malformed payload).
    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
