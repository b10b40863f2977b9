// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound frame classification.
//!
//! Turns raw transport frames into [`InboundEvent`]s. Media is recognized by
//! topic or magic number and never text-decoded. Everything that is not a
//! known event is dropped here and only logged.

use chrono::{DateTime, Utc};
use pv_core::{
    ConversationDetail, ConversationSummary, MediaFormat, Message, ServerMessage, MEDIA_TOPIC,
};

use super::transport::Frame;

/// A streamed piece of assistant text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub text: String,
    pub done: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Raw media bytes for the media-delivery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChunk {
    /// Detected container, when the bytes carry a known signature.
    pub format: Option<MediaFormat>,
    pub bytes: Vec<u8>,
}

/// Typed inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    ConversationsListed(Vec<ConversationSummary>),
    ConversationLoaded(ConversationDetail),
    ConversationCreated { id: String },
    ConversationRenamed { id: String, title: String },
    ConversationDeleted { id: String, replacement: Option<String> },
    AllConversationsCleared { replacement: Option<String> },
    AssistantTextChunk(TextChunk),
    AssistantMediaChunk(MediaChunk),
    /// A complete message recorded by the service.
    MessageAdded(Message),
}

impl InboundEvent {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::ConversationsListed(_) => "conversations_listed",
            InboundEvent::ConversationLoaded(_) => "conversation_loaded",
            InboundEvent::ConversationCreated { .. } => "conversation_created",
            InboundEvent::ConversationRenamed { .. } => "conversation_renamed",
            InboundEvent::ConversationDeleted { .. } => "conversation_deleted",
            InboundEvent::AllConversationsCleared { .. } => "all_conversations_cleared",
            InboundEvent::AssistantTextChunk(_) => "assistant_text_chunk",
            InboundEvent::AssistantMediaChunk(_) => "assistant_media_chunk",
            InboundEvent::MessageAdded(_) => "message_added",
        }
    }
}

/// Why a frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    /// Not UTF-8, not JSON, or missing required fields.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Valid envelope with a type this client does not handle.
    #[error("unhandled event type: {0}")]
    UnknownType(String),
}

/// Classifies inbound frames.
#[derive(Debug, Clone)]
pub struct InboundRouter {
    media_topic: String,
}

impl Default for InboundRouter {
    fn default() -> Self {
        Self::new(MEDIA_TOPIC)
    }
}

impl InboundRouter {
    /// Creates a router treating `media_topic` as the media channel.
    pub fn new(media_topic: impl Into<String>) -> Self {
        InboundRouter { media_topic: media_topic.into() }
    }

    /// Classify a frame, dropping anything that is not an event.
    ///
    /// Never fails; drops are logged.
    pub fn route(&self, frame: &Frame) -> Option<InboundEvent> {
        match self.classify(frame) {
            Ok(event) => Some(event),
            Err(DropReason::Malformed(reason)) => {
                tracing::warn!("dropping malformed frame ({} bytes): {}", frame.payload.len(), reason);
                None
            }
            Err(DropReason::UnknownType(kind)) => {
                tracing::debug!("dropping unhandled event type {}", kind);
                None
            }
        }
    }

    /// Classify a frame, reporting why it would be dropped.
    pub fn classify(&self, frame: &Frame) -> Result<InboundEvent, DropReason> {
        let sniffed = MediaFormat::sniff(&frame.payload);
        if sniffed.is_some() || frame.topic.as_deref() == Some(self.media_topic.as_str()) {
            return Ok(InboundEvent::AssistantMediaChunk(MediaChunk {
                format: sniffed,
                bytes: frame.payload.clone(),
            }));
        }

        let text = std::str::from_utf8(&frame.payload)
            .map_err(|e| DropReason::Malformed(e.to_string()))?;
        let message =
            ServerMessage::from_json(text).map_err(|e| DropReason::Malformed(e.to_string()))?;

        match message {
            ServerMessage::ConversationsList { conversations } => {
                Ok(InboundEvent::ConversationsListed(conversations))
            }
            ServerMessage::ConversationData { conversation } => {
                Ok(InboundEvent::ConversationLoaded(conversation.normalize()))
            }
            ServerMessage::NewConversationCreated { conversation_id } => {
                Ok(InboundEvent::ConversationCreated { id: conversation_id })
            }
            ServerMessage::ConversationRenamed { conversation_id, title } => {
                Ok(InboundEvent::ConversationRenamed { id: conversation_id, title })
            }
            ServerMessage::ConversationDeleted { conversation_id, new_conversation_id } => {
                Ok(InboundEvent::ConversationDeleted {
                    id: conversation_id,
                    replacement: new_conversation_id,
                })
            }
            ServerMessage::AllConversationsCleared { new_conversation_id } => {
                Ok(InboundEvent::AllConversationsCleared { replacement: new_conversation_id })
            }
            ServerMessage::AssistantText { conversation_id, message_id, text, done, timestamp } => {
                Ok(InboundEvent::AssistantTextChunk(TextChunk {
                    conversation_id,
                    message_id,
                    text,
                    done,
                    timestamp,
                }))
            }
            ServerMessage::Message { message } => Ok(InboundEvent::MessageAdded(message)),
            ServerMessage::Error { message } => {
                tracing::warn!("service reported an error: {}", message);
                Err(DropReason::UnknownType("error".to_string()))
            }
            ServerMessage::Unknown => Err(DropReason::UnknownType(envelope_type(text))),
        }
    }
}

/// Best-effort extraction of the `type` field for diagnostics.
fn envelope_type(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_else(|| "<unknown>".to_string())
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
