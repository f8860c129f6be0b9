// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run, job, and worker identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Length of a user-visible run identifier.
///
/// Six uppercase hex characters is the compatibility contract for
/// identifiers users type back into the channel. The space is small
/// (~16.7M); insert-time collisions are handled by regeneration.
pub const RUN_ID_LEN: usize = 6;

/// Errors produced when parsing identifiers from external input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid run id: {0:?}")]
    InvalidRunId(String),
    #[error("invalid job key: {0:?}")]
    InvalidJobKey(String),
}

/// Unique identifier for a run: exactly 6 uppercase hex characters.
///
/// Stored inline so the type is `Copy`, in the manner of the inline ID
/// buffers used elsewhere in the workspace.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId {
    buf: [u8; RUN_ID_LEN],
}

impl RunId {
    /// Generate a fresh run id from a v4 UUID: the first 6 hex digits,
    /// uppercased.
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let hex = format!("{:X}", uuid.as_u128());
        // u128 formatting drops leading zeros; left-pad to 32 digits.
        let padded = format!("{hex:0>32}");
        let mut buf = [0u8; RUN_ID_LEN];
        buf.copy_from_slice(&padded.as_bytes()[..RUN_ID_LEN]);
        Self { buf }
    }

    /// Parse a run id from user input. Accepts hex in any case and
    /// normalizes to uppercase; anything else is rejected.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.len() != RUN_ID_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdError::InvalidRunId(s.to_string()));
        }
        let mut buf = [0u8; RUN_ID_LEN];
        for (dst, b) in buf.iter_mut().zip(s.bytes()) {
            *dst = b.to_ascii_uppercase();
        }
        Ok(Self { buf })
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only constructed from ASCII hex digits.
        match std::str::from_utf8(&self.buf) {
            Ok(s) => s,
            Err(_) => unreachable!("RunId constructed from non-ASCII bytes"),
        }
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RunId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RunId::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for RunId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for RunId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Free-form job identifier matching `[A-Za-z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobKey(String);

/// Returns true when `s` is a non-empty run of `[A-Za-z0-9_-]` characters.
pub fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl JobKey {
    pub fn new(s: impl Into<String>) -> Result<Self, IdError> {
        let s = s.into();
        if is_token(&s) {
            Ok(Self(s))
        } else {
            Err(IdError::InvalidJobKey(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobKey {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, IdError> {
        JobKey::new(s)
    }
}

impl From<JobKey> for String {
    fn from(k: JobKey) -> String {
        k.0
    }
}

impl Borrow<str> for JobKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JobKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for JobKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Unique identifier for a worker instance, e.g. `worker-host-1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Create a new WorkerId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
