// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound and outbound message contracts.

use crate::id::{JobKey, RunId};
use serde::{Deserialize, Serialize};

/// Channel id used for error replies that have no run to route by.
pub const SYSTEM_CHANNEL: &str = "system";

/// A message received from an upstream provider. Delivery is
/// at-least-once; `(channel_id, provider_message_id)` is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: String,
    pub provider_message_id: String,
    /// Address of the sender.
    pub from_address: String,
    pub conversation_id: String,
    pub body: String,
}

/// A reply the platform should deliver. The idempotency key lets the
/// delivery layer suppress duplicates from at-least-once processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel_id: String,
    pub conversation_id: String,
    pub body: String,
    /// Run id, or `"none"` for replies with no associated run.
    pub correlation_id: String,
    pub idempotency_key: String,
}

impl OutboundMessage {
    /// Reply routed to a run's original conversation.
    pub fn to_run_conversation(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        body: impl Into<String>,
        run_id: RunId,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            body: body.into(),
            correlation_id: run_id.to_string(),
            idempotency_key: idempotency_key.into(),
        }
    }

    /// Parse-time reply routed back to the inbound's conversation, keyed by
    /// the inbound's dedup identity.
    pub fn reply_to(inbound: &InboundMessage, body: impl Into<String>) -> Self {
        Self {
            channel_id: inbound.channel_id.clone(),
            conversation_id: inbound.conversation_id.clone(),
            body: body.into(),
            correlation_id: "none".to_string(),
            idempotency_key: format!(
                "reply:{}:{}",
                inbound.channel_id, inbound.provider_message_id
            ),
        }
    }

    /// Error reply for a run id that does not resolve to any run.
    pub fn to_system_channel(body: impl Into<String>, idempotency_key: impl Into<String>) -> Self {
        Self {
            channel_id: SYSTEM_CHANNEL.to_string(),
            conversation_id: SYSTEM_CHANNEL.to_string(),
            body: body.into(),
            correlation_id: "none".to_string(),
            idempotency_key: idempotency_key.into(),
        }
    }
}

/// The unit of work handed to the execution queue when a human approves a
/// run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDispatch {
    pub run_id: RunId,
    pub job_key: JobKey,
}
