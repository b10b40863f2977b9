// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable timers.
//!
//! Reconnect backoff and publish retries never call `tokio::time::sleep`
//! directly; they ask a [`Sleeper`]. Production uses [`TokioSleeper`], tests
//! use [`RecordingSleeper`] to observe requested delays without waiting.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Boxed timer future. Dropping it cancels the wait.
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Schedules resumptions after a delay.
pub trait Sleeper: Send + Sync {
    /// Returns a future that completes after `delay`.
    fn sleep(&self, delay: Duration) -> SleepFuture;
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// Sleeper that completes immediately and records every requested delay.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.delays().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) -> SleepFuture {
        self.delays.lock().unwrap_or_else(|e| e.into_inner()).push(delay);
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
