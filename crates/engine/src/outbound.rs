// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound message delivery seam.

use textops_core::OutboundMessage;

/// Delivery sink for outbound messages produced while processing queue
/// entries. The platform's channel adapter provides the real one; the
/// default logs to stderr, which is the minimum delivery contract.
pub trait OutboundSink: Send + Sync {
    fn deliver(&self, message: &OutboundMessage);
}

/// Writes `OUTBOUND ({channel}): {body}` to stderr.
pub struct StderrSink;

impl OutboundSink for StderrSink {
    fn deliver(&self, message: &OutboundMessage) {
        eprintln!("OUTBOUND ({}): {}", message.channel_id, message.body);
    }
}
