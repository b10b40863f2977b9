// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn fractional_growth_caps_at_max() {
    let policy = BackoffPolicy::new(10, 1, 10, 1.5);
    let delays: Vec<f64> = (1..=10).map(|k| policy.delay_ms_for_attempt(k)).collect();
    assert_eq!(delays, vec![1.0, 1.5, 2.25, 3.375, 5.0625, 7.59375, 10.0, 10.0, 10.0, 10.0]);
}

#[parameterized(
    first = { 1, 100 },
    second = { 2, 200 },
    fourth = { 4, 800 },
    capped = { 20, 30_000 },
    zero_treated_as_first = { 0, 100 },
)]
fn default_policy_delays(attempt: u32, expected_ms: u64) {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay_for_attempt(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn huge_attempt_does_not_overflow() {
    let policy = BackoffPolicy::new(10, 100, 5_000, 2.0);
    assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_millis(5_000));
}

#[test]
fn exhaustion_starts_after_max_retries() {
    let policy = BackoffPolicy::new(3, 10, 100, 2.0);
    assert!(!policy.is_exhausted(3));
    assert!(policy.is_exhausted(4));
}
