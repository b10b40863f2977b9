// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON wire protocol between the client and the conversation service.
//!
//! Every text frame is an object `{ "type": ..., ...fields }`:
//! - The client sends [`OutboundCommand`]s
//! - The service answers and broadcasts [`ServerMessage`]s
//!
//! Unknown server message types decode to [`ServerMessage::Unknown`] so newer
//! services can add events without breaking older clients. Unknown fields are
//! ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationDetail, ConversationSummary, Message};

/// Commands sent from client to service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundCommand {
    /// Request the conversation list. Answered by `conversations_list`.
    ListConversations,

    /// Request one conversation with its messages. Answered by
    /// `conversation_data`.
    GetConversation { conversation_id: String },

    /// Create a conversation. Answered by `new_conversation_created`.
    #[serde(rename = "new_conversation")]
    CreateConversation { title: String },

    /// Rename a conversation.
    RenameConversation { conversation_id: String, title: String },

    /// Delete a conversation.
    DeleteConversation { conversation_id: String },

    /// Delete every conversation.
    #[serde(rename = "clear_all_conversations")]
    ClearAll,

    /// Free-text message from the user.
    #[serde(rename = "user_message")]
    SendUserMessage {
        text: String,
        /// Target conversation; the service uses its current one when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
    },
}

impl OutboundCommand {
    /// Creates a GetConversation command.
    pub fn get(conversation_id: impl Into<String>) -> Self {
        OutboundCommand::GetConversation { conversation_id: conversation_id.into() }
    }

    /// Creates a CreateConversation command.
    pub fn create(title: impl Into<String>) -> Self {
        OutboundCommand::CreateConversation { title: title.into() }
    }

    /// Creates a RenameConversation command.
    pub fn rename(conversation_id: impl Into<String>, title: impl Into<String>) -> Self {
        OutboundCommand::RenameConversation {
            conversation_id: conversation_id.into(),
            title: title.into(),
        }
    }

    /// Creates a DeleteConversation command.
    pub fn delete(conversation_id: impl Into<String>) -> Self {
        OutboundCommand::DeleteConversation { conversation_id: conversation_id.into() }
    }

    /// Creates a SendUserMessage command.
    pub fn user_message(text: impl Into<String>, conversation_id: Option<String>) -> Self {
        OutboundCommand::SendUserMessage { text: text.into(), conversation_id }
    }

    /// Wire name of the command, as found in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundCommand::ListConversations => "list_conversations",
            OutboundCommand::GetConversation { .. } => "get_conversation",
            OutboundCommand::CreateConversation { .. } => "new_conversation",
            OutboundCommand::RenameConversation { .. } => "rename_conversation",
            OutboundCommand::DeleteConversation { .. } => "delete_conversation",
            OutboundCommand::ClearAll => "clear_all_conversations",
            OutboundCommand::SendUserMessage { .. } => "user_message",
        }
    }

    /// Serializes the command to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the command from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Messages sent from service to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full replacement of the conversation list.
    ConversationsList { conversations: Vec<ConversationSummary> },

    /// One conversation with its messages.
    ConversationData { conversation: ConversationDetail },

    /// A conversation was created.
    NewConversationCreated { conversation_id: String },

    /// A conversation was renamed.
    ConversationRenamed { conversation_id: String, title: String },

    /// A conversation was deleted. `new_conversation_id` names the
    /// conversation the client should switch to, if any.
    ConversationDeleted {
        conversation_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_conversation_id: Option<String>,
    },

    /// Every conversation was deleted.
    AllConversationsCleared {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_conversation_id: Option<String>,
    },

    /// A piece of streamed assistant text.
    AssistantText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        /// Groups chunks belonging to one assistant message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        text: String,
        /// True on the last chunk of a message.
        #[serde(default)]
        done: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },

    /// A complete message recorded by the service, including echoes of the
    /// client's own user messages.
    Message { message: Message },

    /// The service rejected a command.
    Error { message: String },

    /// Any message type this client does not know.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Creates a ConversationsList message.
    pub fn conversations_list(conversations: Vec<ConversationSummary>) -> Self {
        ServerMessage::ConversationsList { conversations }
    }

    /// Creates a ConversationData message.
    pub fn conversation_data(conversation: ConversationDetail) -> Self {
        ServerMessage::ConversationData { conversation }
    }

    /// Creates a NewConversationCreated message.
    pub fn created(conversation_id: impl Into<String>) -> Self {
        ServerMessage::NewConversationCreated { conversation_id: conversation_id.into() }
    }

    /// Creates a ConversationRenamed message.
    pub fn renamed(conversation_id: impl Into<String>, title: impl Into<String>) -> Self {
        ServerMessage::ConversationRenamed {
            conversation_id: conversation_id.into(),
            title: title.into(),
        }
    }

    /// Creates a ConversationDeleted message.
    pub fn deleted(conversation_id: impl Into<String>, new_conversation_id: Option<String>) -> Self {
        ServerMessage::ConversationDeleted {
            conversation_id: conversation_id.into(),
            new_conversation_id,
        }
    }

    /// Creates an AllConversationsCleared message.
    pub fn cleared(new_conversation_id: Option<String>) -> Self {
        ServerMessage::AllConversationsCleared { new_conversation_id }
    }

    /// Creates a Message message.
    pub fn message(message: Message) -> Self {
        ServerMessage::Message { message }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
