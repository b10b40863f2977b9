// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff policy for reconnection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect policy.
///
/// `delay(k) = min(max_delay_ms, initial_delay_ms * backoff_factor^(k-1))`
/// for attempt `k >= 1`. Attempts beyond `max_retries` are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Reconnect attempts allowed before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first reconnect attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_retries() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64, backoff_factor: f64) -> Self {
        BackoffPolicy { max_retries, initial_delay_ms, max_delay_ms, backoff_factor }
    }

    /// Delay in (fractional) milliseconds before attempt `attempt`.
    ///
    /// Attempt numbering starts at 1; attempt 0 is treated as 1.
    pub fn delay_ms_for_attempt(&self, attempt: u32) -> f64 {
        let exponent = attempt.max(1).saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.initial_delay_ms as f64 * self.backoff_factor.powi(exponent);
        raw.min(self.max_delay_ms as f64)
    }

    /// Delay before attempt `attempt` as a [`Duration`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_nanos((self.delay_ms_for_attempt(attempt) * 1_000_000.0).round() as u64)
    }

    /// Returns true once `attempt` exceeds the retry budget.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_retries
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
