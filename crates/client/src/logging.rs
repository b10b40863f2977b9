// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup for the `palaver` binary.
//!
//! Logs go to stderr so they never interleave with conversation output on
//! stdout.

use tracing_subscriber::EnvFilter;

use crate::env;

/// Filter directive used when neither `RUST_LOG` nor `PALAVER_LOG` is set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Resolve the log filter: `RUST_LOG`, then `PALAVER_LOG`, then the
/// verbosity flag.
pub fn filter(verbose: bool) -> EnvFilter {
    if env::rust_log_set() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    env::log_filter()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
