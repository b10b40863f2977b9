// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pv-core operations.

use thiserror::Error;

/// All possible errors that can occur in pv-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid timestamp: {0} ms is out of range")]
    InvalidTimestamp(u64),
}

/// A specialized Result type for pv-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
