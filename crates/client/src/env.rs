// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by the client are defined here
//! with typed accessor functions. The variable name constants are generated
//! by `build.rs` and live in the [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `PALAVER_URL` if set and non-empty.
pub fn url() -> Option<String> {
    non_empty(vars::PALAVER_URL)
}

/// Returns the value of `PALAVER_TOKEN` if set and non-empty.
pub fn token() -> Option<String> {
    non_empty(vars::PALAVER_TOKEN)
}

/// Returns the value of `PALAVER_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty(vars::PALAVER_CONFIG).map(PathBuf::from)
}

/// Returns the value of `PALAVER_LOG` if set.
pub fn log_filter() -> Option<String> {
    non_empty(vars::PALAVER_LOG)
}

/// Returns `true` if `RUST_LOG` is set.
pub fn rust_log_set() -> bool {
    std::env::var(vars::RUST_LOG).is_ok()
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
