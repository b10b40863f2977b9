// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side conversation state.
//!
//! [`reduce`] is a pure function: it takes the current state and one input
//! and returns the next state plus the commands the caller should publish.
//! It performs no I/O and never retries anything.

mod reducer;

pub use reducer::{reduce, ConversationState, Input, LocalAction, PREVIEW_CHARS};
