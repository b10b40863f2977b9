// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use pv_core::{ConversationDetail, ConversationSummary, Message, OutboundCommand, Role};

use crate::sync::{InboundEvent, TextChunk};

/// Characters kept in a summary's last-message preview.
pub const PREVIEW_CHARS: usize = 80;

/// Everything the client knows about conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// Conversation list, in server order.
    pub summaries: Vec<ConversationSummary>,
    /// The one open conversation.
    pub active: Option<ConversationDetail>,
    /// Conversation requested with `get_conversation` and not loaded yet.
    pub requested: Option<String>,
    /// Assistant message currently receiving streamed text.
    pub streaming: Option<String>,
}

impl ConversationState {
    /// ID of the active conversation.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|d| d.id.as_str())
    }

    /// Look up a summary by ID.
    pub fn summary(&self, id: &str) -> Option<&ConversationSummary> {
        self.summaries.iter().find(|s| s.id == id)
    }

    fn request(&mut self, id: String, effects: &mut Vec<OutboundCommand>) {
        effects.push(OutboundCommand::get(id.clone()));
        self.requested = Some(id);
    }

    fn clear_active(&mut self) {
        self.active = None;
        self.streaming = None;
    }
}

/// Actions that originate on this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAction {
    /// Optimistically append the user's message to the active conversation.
    SendUserMessage { message: Message },
    /// Optimistically rename a conversation.
    RenameConversation { id: String, title: String },
    /// A `get_conversation` for `id` could not be published.
    RequestFailed { id: String },
    /// The link (re)connected; answers to earlier requests are not coming.
    LinkRestored,
}

/// One reducer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Inbound(InboundEvent),
    Local(LocalAction),
}

/// Merge one input into the state.
///
/// Returns the new state and the commands to publish, in order.
pub fn reduce(
    mut state: ConversationState,
    input: &Input,
) -> (ConversationState, Vec<OutboundCommand>) {
    let mut effects = Vec::new();

    match input {
        Input::Inbound(event) => apply_inbound(&mut state, event, &mut effects),
        Input::Local(LocalAction::SendUserMessage { message }) => {
            if let Some(active) = state.active.as_mut() {
                if message.conversation_id.is_empty() || message.conversation_id == active.id {
                    let mut message = message.clone();
                    message.conversation_id = active.id.clone();
                    message.timestamp = clamp(active, Some(message.timestamp));
                    active.messages.push(message);
                }
            }
        }
        Input::Local(LocalAction::RenameConversation { id, title }) => {
            rename(&mut state, id, title);
        }
        Input::Local(LocalAction::RequestFailed { id }) => {
            if state.requested.as_ref() == Some(id) {
                state.requested = None;
            }
        }
        Input::Local(LocalAction::LinkRestored) => state.requested = None,
    }

    reconcile_active_summary(&mut state);
    (state, effects)
}

fn apply_inbound(
    state: &mut ConversationState,
    event: &InboundEvent,
    effects: &mut Vec<OutboundCommand>,
) {
    match event {
        InboundEvent::ConversationsListed(list) => {
            state.summaries = list.clone();
            // A pending request only holds while its conversation is listed.
            let pending = state.requested.as_ref().is_some_and(|id| list.iter().any(|s| &s.id == id));
            if state.active.is_none() && !pending {
                if let Some(selected) = most_recent(list) {
                    state.request(selected.id.clone(), effects);
                }
            }
        }
        InboundEvent::ConversationLoaded(detail) => {
            if state.active_id() != Some(detail.id.as_str()) {
                state.streaming = None;
            }
            if state.requested.as_deref() == Some(detail.id.as_str()) {
                state.requested = None;
            }
            state.active = Some(detail.clone());
        }
        InboundEvent::ConversationCreated { id } => {
            effects.push(OutboundCommand::ListConversations);
            state.request(id.clone(), effects);
        }
        InboundEvent::ConversationRenamed { id, title } => rename(state, id, title),
        InboundEvent::ConversationDeleted { id, replacement } => {
            state.summaries.retain(|s| &s.id != id);
            if state.requested.as_ref() == Some(id) {
                state.requested = None;
            }
            if state.active_id() == Some(id.as_str()) {
                state.clear_active();
                if let Some(replacement) = replacement {
                    state.request(replacement.clone(), effects);
                }
            }
        }
        InboundEvent::AllConversationsCleared { replacement } => {
            state.summaries.clear();
            state.requested = None;
            state.clear_active();
            if let Some(replacement) = replacement {
                state.request(replacement.clone(), effects);
            }
        }
        InboundEvent::AssistantTextChunk(chunk) => append_chunk(state, chunk),
        InboundEvent::AssistantMediaChunk(_) => {}
        InboundEvent::MessageAdded(message) => {
            let Some(active) = state.active.as_mut() else {
                return;
            };
            let conversation_id =
                if message.conversation_id.is_empty() { &active.id } else { &message.conversation_id };
            if conversation_id != &active.id || active.messages.iter().any(|m| m.id == message.id) {
                return;
            }
            let mut message = message.clone();
            message.conversation_id = active.id.clone();
            let at = active.messages.partition_point(|m| m.timestamp <= message.timestamp);
            active.messages.insert(at, message);
        }
    }
}

/// Max `updated_at`, ties broken by ascending ID.
fn most_recent(list: &[ConversationSummary]) -> Option<&ConversationSummary> {
    list.iter().max_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| b.id.cmp(&a.id)))
}

fn rename(state: &mut ConversationState, id: &str, title: &str) {
    for summary in state.summaries.iter_mut().filter(|s| s.id == id) {
        summary.title = title.to_string();
    }
    if let Some(active) = state.active.as_mut().filter(|a| a.id == id) {
        active.title = title.to_string();
    }
}

fn append_chunk(state: &mut ConversationState, chunk: &TextChunk) {
    let Some(active) = state.active.as_mut() else {
        return;
    };
    if chunk.conversation_id.as_deref().is_some_and(|id| id != active.id) {
        return;
    }

    let target = chunk.message_id.as_ref().or(state.streaming.as_ref());
    let existing = target.and_then(|id| {
        active.messages.iter_mut().find(|m| &m.id == id && m.role == Role::Assistant)
    });

    let id = match existing {
        Some(message) => {
            message.content.push_str(&chunk.text);
            message.id.clone()
        }
        None => {
            let id = chunk
                .message_id
                .clone()
                .unwrap_or_else(|| format!("{}-stream-{}", active.id, active.messages.len()));
            let timestamp = clamp(active, chunk.timestamp);
            active.messages.push(Message::new(
                id.clone(),
                active.id.clone(),
                Role::Assistant,
                chunk.text.clone(),
                timestamp,
            ));
            id
        }
    };

    state.streaming = if chunk.done { None } else { Some(id) };
}

/// A timestamp no earlier than the newest message.
fn clamp(detail: &ConversationDetail, timestamp: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let floor = detail.last_timestamp().unwrap_or(detail.updated_at);
    match timestamp {
        Some(ts) if ts >= floor => ts,
        _ => floor,
    }
}

fn reconcile_active_summary(state: &mut ConversationState) {
    let Some(active) = state.active.as_ref() else {
        return;
    };
    let Some(summary) = state.summaries.iter_mut().find(|s| s.id == active.id) else {
        return;
    };

    summary.message_count = active.messages.len() as u64;
    summary.last_message_preview = active.messages.last().map(|m| m.preview(PREVIEW_CHARS));
    if let Some(latest) = active.last_timestamp() {
        summary.updated_at = summary.updated_at.max(latest);
    }
}

#[cfg(test)]
#[path = "reducer_tests.rs"]
mod tests;
