// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the palaver client outside the sync layer.
///
/// Publish and transport failures have their own types in [`crate::sync`];
/// they are reported to callers, not converted into this one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid url '{0}'\n  hint: the url must start with ws:// or wss://")]
    InvalidUrl(String),

    #[error("{field} must be {requirement}")]
    InvalidSetting {
        field: &'static str,
        requirement: &'static str,
    },

    #[error("unknown command '/{0}'\n  hint: type /quit to exit, or see --help for commands")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("session is closed")]
    SessionClosed,

    #[error("session task failed: {0}")]
    SessionTask(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Core(#[from] pv_core::Error),
}

/// A specialized Result type for palaver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
