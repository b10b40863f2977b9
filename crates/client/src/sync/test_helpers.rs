// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pv_core::{timestamp_from_ms, ConversationDetail, ConversationSummary, Message, Role};

use super::backoff::BackoffPolicy;
use super::supervisor::{ConnectionSupervisor, Endpoint};
use super::timer::RecordingSleeper;
use super::transport_tests::{MockHandle, MockTransport};

pub const TEST_URL: &str = "ws://localhost:7890";

/// Timestamp `ms` milliseconds after the epoch.
pub fn ts(ms: u64) -> DateTime<Utc> {
    timestamp_from_ms(ms).unwrap()
}

/// A supervisor over a mock transport with a recording sleeper.
pub fn mock_supervisor(
    policy: BackoffPolicy,
) -> (ConnectionSupervisor<MockTransport>, MockHandle, RecordingSleeper) {
    let transport = MockTransport::new();
    let handle = transport.handle();
    let sleeper = RecordingSleeper::new();
    let supervisor = ConnectionSupervisor::new(
        transport,
        Endpoint::new(TEST_URL, Some("secret".to_string())),
        policy,
        Arc::new(sleeper.clone()),
    );
    (supervisor, handle, sleeper)
}

/// A summary updated at `updated_ms`.
pub fn summary(id: &str, updated_ms: u64) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        title: format!("Conversation {id}"),
        created_at: ts(0),
        updated_at: ts(updated_ms),
        message_count: 0,
        last_message_preview: None,
    }
}

/// A detail holding `messages` as (role, content, ms) triples.
pub fn detail(id: &str, messages: &[(Role, &str, u64)]) -> ConversationDetail {
    ConversationDetail {
        id: id.to_string(),
        title: format!("Conversation {id}"),
        created_at: ts(0),
        updated_at: ts(messages.last().map(|m| m.2).unwrap_or(0)),
        messages: messages
            .iter()
            .enumerate()
            .map(|(i, (role, content, ms))| {
                Message::new(format!("{id}-m{i}"), id, *role, *content, ts(*ms))
            })
            .collect(),
    }
}
