// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation data model.
//!
//! These types travel inside wire frames, so field names are the snake_case
//! names the remote service uses and timestamps are RFC 3339 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Typed by the person using the client.
    User,
    /// Produced by the remote assistant.
    Assistant,
}

impl Role {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Owning conversation. Servers may omit it inside `conversation_data`;
    /// [`ConversationDetail::normalize`] fills it in.
    #[serde(default)]
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message.
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Message {
            id: id.into(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Returns the content truncated to at most `max_chars` characters,
    /// with an ellipsis appended when truncated.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}…")
        } else {
            head
        }
    }
}

/// List-level view of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<String>,
}

/// A fully loaded conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationDetail {
    /// Fills missing message conversation IDs and orders messages by
    /// timestamp. The sort is stable, so messages sharing a timestamp keep
    /// their delivery order.
    pub fn normalize(mut self) -> Self {
        for message in &mut self.messages {
            if message.conversation_id.is_empty() {
                message.conversation_id = self.id.clone();
            }
        }
        self.messages.sort_by_key(|m| m.timestamp);
        self
    }

    /// Timestamp of the newest message, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.timestamp)
    }

    /// Builds the summary this detail implies.
    pub fn summary(&self, preview_chars: usize) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len() as u64,
            last_message_preview: self.messages.last().map(|m| m.preview(preview_chars)),
        }
    }
}

/// Converts a clock reading (milliseconds since Unix epoch) to a timestamp.
pub fn timestamp_from_ms(ms: u64) -> Result<DateTime<Utc>> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(Error::InvalidTimestamp(ms))
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
