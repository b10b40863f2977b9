// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session synchronization layer.
//!
//! Keeps the client's view of its conversations consistent over a
//! real-time channel that may drop, duplicate, or reorder messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │  Reliable    │──►│   Connection     │──►│  Transport  │
//! │  Publisher   │   │   Supervisor     │◄──│   (trait)   │
//! └──────────────┘   └──────────────────┘   └─────────────┘
//!        ▲                    │ frames
//!        │ effects            ▼
//! ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │   reduce()   │◄──│  Deduplicator    │◄──│   Inbound   │
//! │  (state)     │   │                  │   │   Router    │
//! └──────────────┘   └──────────────────┘   └─────────────┘
//! ```
//!
//! # Features
//!
//! - Connection state machine with exponential reconnect backoff
//! - Bounded publish retry, failing fast when not connected
//! - Binary media detection by topic or magic number
//! - Time-windowed duplicate suppression with optimistic updates
//! - Injectable transport, clock, and timer for testing

mod backoff;
mod dedup;
mod publisher;
mod router;
mod session;
mod supervisor;
mod timer;
mod transport;

pub use backoff::BackoffPolicy;
pub use dedup::{DedupPolicy, Deduplicator, Signature};
pub use publisher::{PublishError, PublishFailureKind, PublishPolicy, ReliablePublisher};
pub use router::{DropReason, InboundEvent, InboundRouter, MediaChunk, TextChunk};
pub use session::{Session, SessionCommand, SessionConfig, SessionHandle, SessionUpdate};
pub use supervisor::{ConnectionState, ConnectionSupervisor, Endpoint, LinkEvent, StateChange};
pub use timer::{RecordingSleeper, SleepFuture, Sleeper, TokioSleeper};
pub use transport::{
    Frame, Transport, TransportError, TransportEvent, TransportFuture, TransportResult,
    WebSocketTransport,
};

#[cfg(test)]
mod test_helpers;
