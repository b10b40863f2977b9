// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::DateTime;
use pv_core::{ConversationDetail, ConversationSummary, MediaFormat};
use yare::parameterized;

use super::*;
use crate::sync::{ConnectionState, MediaChunk};

fn at(ms: i64) -> chrono::DateTime<chrono::Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn message(id: &str, role: Role, content: &str) -> Message {
    Message::new(id, "c1", role, content, at(1_000))
}

fn with_active(title: &str, messages: Vec<Message>) -> ConversationState {
    ConversationState {
        summaries: vec![ConversationSummary {
            id: "c1".into(),
            title: title.into(),
            created_at: at(0),
            updated_at: at(1_000),
            message_count: messages.len() as u64,
            last_message_preview: None,
        }],
        active: Some(ConversationDetail {
            id: "c1".into(),
            title: title.into(),
            created_at: at(0),
            updated_at: at(1_000),
            messages,
        }),
        requested: None,
        streaming: None,
    }
}

#[parameterized(
    connected = {
        StateChange { state: ConnectionState::Connected, attempt: 0, retry_in: None },
        "[connection] connected"
    },
    retrying = {
        StateChange {
            state: ConnectionState::Reconnecting,
            attempt: 2,
            retry_in: Some(Duration::from_millis(1500)),
        },
        "[connection] reconnecting (attempt 2, retry in 1.5s)"
    },
    failed = {
        StateChange { state: ConnectionState::Failed, attempt: 11, retry_in: None },
        "[connection] failed (attempt 11)"
    },
)]
fn test_format_connection(change: StateChange, expected: &str) {
    assert_eq!(format_connection(&change), expected);
}

#[test]
fn test_format_message_roles() {
    assert_eq!(format_message(&message("m1", Role::User, "hi")), "you: hi");
    assert_eq!(format_message(&message("m2", Role::Assistant, "hello")), "assistant: hello");
}

#[test]
fn test_format_state_marks_active() {
    let state = with_active("Trip", vec![message("m1", Role::User, "hi")]);
    let out = format_state(&state);
    assert!(out.contains("* c1  Trip (1 messages)"));
    assert!(out.contains("== Trip =="));
    assert!(out.contains("you: hi"));
}

#[test]
fn test_format_empty_state() {
    assert_eq!(format_state(&ConversationState::default()), "no conversations\n");
}

#[test]
fn test_opening_conversation_prints_history() {
    let next = with_active(
        "Trip",
        vec![message("m1", Role::User, "hi"), message("m2", Role::Assistant, "hello")],
    );
    let lines = render_update(&ConversationState::default(), &SessionUpdate::Conversation(next));
    assert_eq!(lines, vec!["[list] 1 conversations", "== Trip ==", "you: hi", "assistant: hello"]);
}

#[test]
fn test_only_new_messages_print() {
    let previous = with_active("Trip", vec![message("m1", Role::User, "hi")]);
    let next = with_active(
        "Trip",
        vec![message("m1", Role::User, "hi"), message("m2", Role::Assistant, "hello")],
    );
    let lines = render_update(&previous, &SessionUpdate::Conversation(next));
    assert_eq!(lines, vec!["assistant: hello"]);
}

#[test]
fn test_streaming_message_prints_when_done() {
    let mut streaming = with_active("Trip", vec![message("s1", Role::Assistant, "Hel")]);
    streaming.streaming = Some("s1".into());
    let lines =
        render_update(&ConversationState::default(), &SessionUpdate::Conversation(streaming.clone()));
    assert_eq!(lines, vec!["[list] 1 conversations", "== Trip =="]);

    let done = with_active("Trip", vec![message("s1", Role::Assistant, "Hello")]);
    let lines = render_update(&streaming, &SessionUpdate::Conversation(done));
    assert_eq!(lines, vec!["assistant: Hello"]);
}

#[test]
fn test_rename_and_close_lines() {
    let previous = with_active("Trip", vec![]);
    let renamed = with_active("Road trip", vec![]);
    let lines = render_update(&previous, &SessionUpdate::Conversation(renamed));
    assert_eq!(lines, vec!["[conversation] renamed to Road trip"]);

    let closed = ConversationState { active: None, ..previous.clone() };
    let lines = render_update(&previous, &SessionUpdate::Conversation(closed));
    assert_eq!(lines, vec!["[conversation] closed"]);
}

#[test]
fn test_media_and_failure_lines() {
    let media = SessionUpdate::Media(MediaChunk {
        format: Some(MediaFormat::Ogg),
        bytes: b"OggS\0\0".to_vec(),
    });
    assert_eq!(render_update(&ConversationState::default(), &media), vec!["[media] 6 bytes (ogg)"]);

    let failed = SessionUpdate::PublishFailed {
        command: "rename_conversation",
        kind: PublishFailureKind::NotConnected,
        reason: "link is reconnecting".into(),
    };
    assert_eq!(
        render_update(&ConversationState::default(), &failed),
        vec!["[error] rename_conversation failed: not connected (link is reconnecting)"]
    );
}
