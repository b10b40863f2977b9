// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Relay state management.
//!
//! Holds every conversation in memory behind a mutex and fans events out
//! to all connections over a broadcast channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};

use pv_core::{
    timestamp_from_ms, ClockSource, ConversationDetail, ConversationSummary, Message, Role,
    ServerMessage, SystemClock,
};

/// Characters kept in list previews.
const PREVIEW_CHARS: usize = 80;

/// Title given to conversations the relay creates on its own.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Errors reported back to the client as `error` frames.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("message text cannot be empty")]
    EmptyMessage,

    #[error(transparent)]
    Core(#[from] pv_core::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// The stored user message and the assistant reply it produced.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user: Message,
    pub reply: Message,
}

/// Shared relay state.
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<RelayStateInner>,
}

struct RelayStateInner {
    store: Mutex<Store>,
    clock: Arc<dyn ClockSource>,
    /// Broadcast channel for events every connection should see.
    broadcast_tx: broadcast::Sender<ServerMessage>,
}

/// Conversations in creation order.
#[derive(Default)]
struct Store {
    conversations: Vec<ConversationDetail>,
    next_conversation: u64,
    next_message: u64,
}

impl Store {
    fn find_mut(&mut self, id: &str) -> Result<&mut ConversationDetail> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))
    }

    fn insert(&mut self, title: &str, now: DateTime<Utc>) -> String {
        self.next_conversation += 1;
        let id = format!("conv-{}", self.next_conversation);
        self.conversations.push(ConversationDetail {
            id: id.clone(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        });
        id
    }

    fn message_id(&mut self) -> String {
        self.next_message += 1;
        format!("msg-{}", self.next_message)
    }

    /// Most recently updated conversation; ties go to the newest.
    fn most_recent(&self) -> Option<String> {
        self.conversations.iter().max_by_key(|c| c.updated_at).map(|c| c.id.clone())
    }
}

impl RelayState {
    /// Creates an empty relay on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty relay reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        RelayState {
            inner: Arc::new(RelayStateInner { store: Mutex::new(Store::default()), clock, broadcast_tx }),
        }
    }

    fn now(&self) -> Result<DateTime<Utc>> {
        Ok(timestamp_from_ms(self.inner.clock.now_ms())?)
    }

    /// Summaries of every conversation, in creation order.
    pub async fn list(&self) -> Vec<ConversationSummary> {
        let store = self.inner.store.lock().await;
        store.conversations.iter().map(|c| c.summary(PREVIEW_CHARS)).collect()
    }

    /// One conversation with its messages.
    pub async fn get(&self, id: &str) -> Result<ConversationDetail> {
        let mut store = self.inner.store.lock().await;
        store.find_mut(id).map(|c| c.clone())
    }

    /// Creates a conversation and returns its ID.
    pub async fn create(&self, title: &str) -> Result<String> {
        let title = title.trim();
        let title = if title.is_empty() { DEFAULT_TITLE } else { title };
        let now = self.now()?;
        let mut store = self.inner.store.lock().await;
        Ok(store.insert(title, now))
    }

    /// Renames a conversation.
    pub async fn rename(&self, id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RelayError::EmptyTitle);
        }
        let now = self.now()?;
        let mut store = self.inner.store.lock().await;
        let conversation = store.find_mut(id)?;
        conversation.title = title.to_string();
        conversation.updated_at = now;
        Ok(())
    }

    /// Deletes a conversation and names the one to switch to, if any remain.
    pub async fn delete(&self, id: &str) -> Result<Option<String>> {
        let mut store = self.inner.store.lock().await;
        let before = store.conversations.len();
        store.conversations.retain(|c| c.id != id);
        if store.conversations.len() == before {
            return Err(RelayError::NotFound(id.to_string()));
        }
        Ok(store.most_recent())
    }

    /// Deletes every conversation and starts a fresh one, returning its ID.
    pub async fn clear(&self) -> Result<String> {
        let now = self.now()?;
        let mut store = self.inner.store.lock().await;
        store.conversations.clear();
        Ok(store.insert(DEFAULT_TITLE, now))
    }

    /// Records a user message and the assistant's reply.
    ///
    /// Without a target the most recent conversation is used, or a new one
    /// is created when there is none.
    pub async fn add_user_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<Exchange> {
        if text.trim().is_empty() {
            return Err(RelayError::EmptyMessage);
        }
        let now = self.now()?;
        let mut store = self.inner.store.lock().await;

        let target = match conversation_id {
            Some(id) => id.to_string(),
            None => match store.most_recent() {
                Some(id) => id,
                None => store.insert(DEFAULT_TITLE, now),
            },
        };
        let user_id = store.message_id();
        let reply_id = store.message_id();

        let conversation = store.find_mut(&target)?;
        let user = Message::new(user_id, target.clone(), Role::User, text, now);
        let reply = Message::new(reply_id, target, Role::Assistant, reply_to(text), now);
        conversation.messages.push(user.clone());
        conversation.messages.push(reply.clone());
        conversation.updated_at = now;

        Ok(Exchange { user, reply })
    }

    /// Send an event to every connection.
    pub fn broadcast(&self, message: ServerMessage) {
        // No receivers is fine: nobody is connected.
        let _ = self.inner.broadcast_tx.send(message);
    }

    /// Subscribe to broadcast messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.inner.broadcast_tx.subscribe()
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// The canned assistant reply.
fn reply_to(text: &str) -> String {
    format!("You said: {}", text.trim())
}
