// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Time-windowed duplicate suppression.
//!
//! The service can deliver one change twice (direct reply, then broadcast),
//! and a locally applied optimistic update later comes back from the server.
//! Both are caught by remembering event signatures for a short window.
//!
//! [`Deduplicator::check_and_record`] reads and writes in one synchronous
//! call. Keep it that way: an await between the lookup and the insert would
//! let two deliveries of the same change both pass.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use pv_core::{ClockSource, Role};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::router::InboundEvent;

/// Window and capacity for a [`Deduplicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupPolicy {
    /// How long a signature suppresses repeats (milliseconds).
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Most signatures remembered at once; oldest go first.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_window_ms() -> u64 {
    3_000
}

fn default_max_entries() -> usize {
    1_024
}

impl Default for DedupPolicy {
    fn default() -> Self {
        DedupPolicy { window_ms: default_window_ms(), max_entries: default_max_entries() }
    }
}

/// Identity of a semantic change: event kind, identifying fields, and a
/// digest of the content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    kind: &'static str,
    identity: String,
    digest: String,
}

impl Signature {
    fn new(kind: &'static str, identity: impl Into<String>, content: &[&str]) -> Self {
        Signature { kind, identity: identity.into(), digest: digest(content) }
    }

    /// Signature of a user message, shared by the optimistic local append
    /// and the server's echo. Whitespace differences are ignored.
    pub fn user_message(conversation_id: &str, text: &str) -> Self {
        Signature::new("user_message", conversation_id, &[&normalize_whitespace(text)])
    }

    /// Signature of a rename, shared by the optimistic local rename and the
    /// server's `conversation_renamed`.
    pub fn renamed(conversation_id: &str, title: &str) -> Self {
        Signature::new("conversation_renamed", conversation_id, &[title])
    }

    /// Signature of an inbound event.
    ///
    /// Returns `None` for events that are never suppressed: full list and
    /// conversation loads replace state wholesale, and consecutive streamed
    /// chunks may legitimately repeat.
    pub fn for_event(event: &InboundEvent) -> Option<Self> {
        let signature = match event {
            InboundEvent::ConversationCreated { id } => {
                Signature::new("conversation_created", id.as_str(), &[])
            }
            InboundEvent::ConversationRenamed { id, title } => Signature::renamed(id, title),
            InboundEvent::ConversationDeleted { id, replacement } => Signature::new(
                "conversation_deleted",
                id.as_str(),
                &[replacement.as_deref().unwrap_or_default()],
            ),
            InboundEvent::AllConversationsCleared { replacement } => Signature::new(
                "all_conversations_cleared",
                "",
                &[replacement.as_deref().unwrap_or_default()],
            ),
            InboundEvent::MessageAdded(message) => match message.role {
                Role::User => Signature::user_message(&message.conversation_id, &message.content),
                Role::Assistant => {
                    Signature::new("assistant_message", message.id.as_str(), &[&message.content])
                }
            },
            InboundEvent::ConversationsListed(_)
            | InboundEvent::ConversationLoaded(_)
            | InboundEvent::AssistantTextChunk(_)
            | InboundEvent::AssistantMediaChunk(_) => return None,
        };
        Some(signature)
    }
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let hash = hasher.finalize();
    hex::encode(&hash[..8])
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-session signature cache.
///
/// Ages are measured with the injected clock, which must not run
/// backwards; sessions use [`pv_core::MonotonicClock`].
pub struct Deduplicator {
    clock: Arc<dyn ClockSource>,
    policy: DedupPolicy,
    seen: HashMap<Signature, u64>,
    /// Recording order, oldest first.
    order: VecDeque<(Signature, u64)>,
}

impl Deduplicator {
    /// Create an empty deduplicator.
    pub fn new(clock: Arc<dyn ClockSource>, policy: DedupPolicy) -> Self {
        Deduplicator { clock, policy, seen: HashMap::new(), order: VecDeque::new() }
    }

    /// The window and capacity in force.
    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Returns true if `signature` was recorded within the window.
    /// Otherwise records it at the current time and returns false.
    pub fn check_and_record(&mut self, signature: &Signature) -> bool {
        let now = self.clock.now_ms();
        self.evict_expired(now);

        if self.is_fresh(signature, now) {
            return true;
        }

        self.insert(signature, now);
        false
    }

    /// Record `signature` at the current time, whether or not it is fresh.
    ///
    /// Used for local optimistic updates: each one restarts the window its
    /// server echo must arrive in.
    pub fn record(&mut self, signature: &Signature) {
        let now = self.clock.now_ms();
        self.evict_expired(now);
        self.insert(signature, now);
    }

    /// Check without recording.
    pub fn is_duplicate(&mut self, signature: &Signature) -> bool {
        let now = self.clock.now_ms();
        self.evict_expired(now);
        self.is_fresh(signature, now)
    }

    /// Number of remembered signatures.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }

    fn insert(&mut self, signature: &Signature, now: u64) {
        self.seen.insert(signature.clone(), now);
        self.order.push_back((signature.clone(), now));
        while self.seen.len() > self.policy.max_entries {
            if !self.pop_oldest() {
                break;
            }
        }
    }

    fn is_fresh(&self, signature: &Signature, now: u64) -> bool {
        self.seen
            .get(signature)
            .is_some_and(|&seen_at| now.saturating_sub(seen_at) <= self.policy.window_ms)
    }

    fn evict_expired(&mut self, now: u64) {
        while let Some((_, seen_at)) = self.order.front() {
            if now.saturating_sub(*seen_at) <= self.policy.window_ms {
                break;
            }
            self.pop_oldest();
        }
    }

    /// Drop the oldest recording. Returns false when there was none.
    fn pop_oldest(&mut self) -> bool {
        let Some((signature, seen_at)) = self.order.pop_front() else {
            return false;
        };
        // A newer recording of the same signature owns the map entry.
        if self.seen.get(&signature) == Some(&seen_at) {
            self.seen.remove(&signature);
        }
        true
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
