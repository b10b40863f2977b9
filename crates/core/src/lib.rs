// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pv-core: Shared library for the palaver conversation client
//!
//! This crate provides the conversation data model, the JSON wire protocol,
//! binary media detection, and the clock primitives used by both the
//! `palaver` client and the `palaver-relay` development server.

pub mod clock;
pub mod conversation;
pub mod error;
pub mod media;
pub mod protocol;

pub use clock::{ClockSource, ManualClock, MonotonicClock, SystemClock};
pub use conversation::{
    timestamp_from_ms, ConversationDetail, ConversationSummary, Message, Role,
};
pub use error::{Error, Result};
pub use media::{MediaFormat, MEDIA_TOPIC};
pub use protocol::{OutboundCommand, ServerMessage};
