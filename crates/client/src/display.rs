// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;

use pv_core::{Message, Role};

use crate::state::ConversationState;
use crate::sync::{PublishFailureKind, SessionUpdate, StateChange};

/// Format a connection change.
///
/// ```text
/// [connection] reconnecting (attempt 2, retry in 1.5s)
/// ```
pub fn format_connection(change: &StateChange) -> String {
    let mut line = format!("[connection] {}", change.state);
    match (change.attempt, change.retry_in) {
        (0, _) => {}
        (attempt, Some(delay)) => {
            line.push_str(&format!(" (attempt {}, retry in {:.1}s)", attempt, delay.as_secs_f64()))
        }
        (attempt, None) => line.push_str(&format!(" (attempt {})", attempt)),
    }
    line
}

/// Format a message as `role: content`.
pub fn format_message(message: &Message) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    format!("{}: {}", who, message.content)
}

fn failure_label(kind: PublishFailureKind) -> &'static str {
    match kind {
        PublishFailureKind::NotConnected => "not connected",
        PublishFailureKind::MaxRetriesExceeded => "retries exhausted",
        PublishFailureKind::Cancelled => "cancelled",
        PublishFailureKind::Encoding => "encoding failed",
    }
}

/// Format the whole state for `/state`.
pub fn format_state(state: &ConversationState) -> String {
    let mut out = String::new();
    if state.summaries.is_empty() {
        out.push_str("no conversations\n");
    }
    for summary in &state.summaries {
        let marker = if state.active_id() == Some(summary.id.as_str()) { "*" } else { " " };
        out.push_str(&format!(
            "{} {}  {} ({} messages)\n",
            marker, summary.id, summary.title, summary.message_count
        ));
    }
    if let Some(active) = &state.active {
        out.push_str(&format!("\n== {} ==\n", active.title));
        for message in &active.messages {
            out.push_str(&format_message(message));
            out.push('\n');
        }
    }
    out
}

/// Lines to print for one update, given the last conversation snapshot.
///
/// Conversation snapshots print only what changed: a header when the open
/// conversation switches, the list size when it changes, and each message
/// once it is complete. A streaming message prints when its stream closes.
pub fn render_update(previous: &ConversationState, update: &SessionUpdate) -> Vec<String> {
    match update {
        SessionUpdate::Connection(change) => vec![format_connection(change)],
        SessionUpdate::Media(chunk) => {
            let format = chunk.format.map(|f| f.as_str()).unwrap_or("unknown");
            vec![format!("[media] {} bytes ({})", chunk.bytes.len(), format)]
        }
        SessionUpdate::PublishFailed { command, kind, reason } => {
            vec![format!("[error] {} failed: {} ({})", command, failure_label(*kind), reason)]
        }
        SessionUpdate::Conversation(next) => render_changes(previous, next),
    }
}

fn render_changes(previous: &ConversationState, next: &ConversationState) -> Vec<String> {
    let mut lines = Vec::new();

    if previous.summaries.len() != next.summaries.len() {
        lines.push(format!("[list] {} conversations", next.summaries.len()));
    }

    let Some(active) = &next.active else {
        if previous.active.is_some() {
            lines.push("[conversation] closed".to_string());
        }
        return lines;
    };

    let switched = previous.active_id() != Some(active.id.as_str());
    if switched {
        lines.push(format!("== {} ==", active.title));
    } else if previous.active.as_ref().is_some_and(|p| p.title != active.title) {
        lines.push(format!("[conversation] renamed to {}", active.title));
    }

    // Messages already printed: everything settled in the previous snapshot.
    let printed: HashSet<&str> = match (&previous.active, switched) {
        (Some(prev), false) => prev
            .messages
            .iter()
            .filter(|m| previous.streaming.as_deref() != Some(m.id.as_str()))
            .map(|m| m.id.as_str())
            .collect(),
        _ => HashSet::new(),
    };

    for message in &active.messages {
        if printed.contains(message.id.as_str()) {
            continue;
        }
        if next.streaming.as_deref() == Some(message.id.as_str()) {
            continue;
        }
        lines.push(format_message(message));
    }
    lines
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
