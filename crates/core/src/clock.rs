// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock abstraction.
//!
//! Everything that needs "now" (dedup windows, optimistic message
//! timestamps, relay bookkeeping) reads it through [`ClockSource`] so tests
//! can substitute a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall clock reading that never moves backwards.
///
/// Reads the system clock once, then advances with [`Instant`], so a
/// system clock step does not move it. Time windows measured against it
/// stay accurate.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_ms: u64,
    start: Instant,
}

impl MonotonicClock {
    /// Creates a clock anchored at the current system time.
    pub fn new() -> Self {
        MonotonicClock { anchor_ms: SystemClock.now_ms(), start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.anchor_ms.saturating_add(self.start.elapsed().as_millis() as u64)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock reading `initial_ms`.
    pub fn new(initial_ms: u64) -> Self {
        ManualClock { time_ms: AtomicU64::new(initial_ms) }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
