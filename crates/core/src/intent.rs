// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic command grammar: text → structured intent.
//!
//! The grammar is a fixed table of whitespace-separated patterns matched
//! case-insensitively on the keyword. Anything that is not an exact match
//! — trailing tokens, embedded punctuation, partial keywords — is
//! `Unknown`. The parser never guesses.

use crate::id::{is_token, JobKey};
use serde::{Deserialize, Serialize};

/// Structured command extracted from an inbound message body.
///
/// Run id references are carried as raw tokens: resolution (including
/// case normalization and existence) belongs to the orchestrator, which
/// owns the "unknown run id" reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    RunJob { job_key: Option<JobKey> },
    ApproveRun { run_id: String },
    DenyRun { run_id: String },
    Status { run_id: String },
    Unknown,
}

crate::simple_display! {
    Intent {
        RunJob { .. } => "RunJob",
        ApproveRun { .. } => "ApproveRun",
        DenyRun { .. } => "DenyRun",
        Status { .. } => "Status",
        Unknown => "Unknown",
    }
}

/// Parse result: the intent plus the raw trimmed text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub raw: String,
}

/// Parse a message body into an intent. Pure and total.
pub fn parse(text: &str) -> ParsedIntent {
    let raw = text.trim().to_string();
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let intent = match tokens.as_slice() {
        [keyword] if keyword.eq_ignore_ascii_case("run") => Intent::RunJob { job_key: None },
        [keyword, token] if is_token(token) => {
            let token = (*token).to_string();
            if keyword.eq_ignore_ascii_case("run") {
                // The token class is exactly the job key grammar.
                match JobKey::new(token) {
                    Ok(job_key) => Intent::RunJob { job_key: Some(job_key) },
                    Err(_) => Intent::Unknown,
                }
            } else if keyword.eq_ignore_ascii_case("yes") || keyword.eq_ignore_ascii_case("approve")
            {
                Intent::ApproveRun { run_id: token }
            } else if keyword.eq_ignore_ascii_case("no") || keyword.eq_ignore_ascii_case("deny") {
                Intent::DenyRun { run_id: token }
            } else if keyword.eq_ignore_ascii_case("status") {
                Intent::Status { run_id: token }
            } else {
                Intent::Unknown
            }
        }
        _ => Intent::Unknown,
    };

    ParsedIntent { intent, raw }
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
