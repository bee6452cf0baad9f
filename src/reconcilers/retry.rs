// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Requeue backoff for failed reconciliations.
//!
//! The controller never retries inside a reconcile invocation. A failed
//! invocation is requeued after a delay that grows exponentially with the
//! number of consecutive failures of that entry, and a success resets it.

use crate::constants::{
    DEFAULT_ERROR_REQUEUE_INITIAL_MILLIS, DEFAULT_ERROR_REQUEUE_MAX_SECS, ERROR_REQUEUE_MULTIPLIER,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Exponential requeue schedule: `initial * multiplier^(failures - 1)`, capped at `max`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequeueBackoff {
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound for any delay
    pub max: Duration,
    /// Growth factor between consecutive failures
    pub multiplier: u32,
}

impl Default for RequeueBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(DEFAULT_ERROR_REQUEUE_INITIAL_MILLIS),
            max: Duration::from_secs(DEFAULT_ERROR_REQUEUE_MAX_SECS),
            multiplier: ERROR_REQUEUE_MULTIPLIER,
        }
    }
}

impl RequeueBackoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: ERROR_REQUEUE_MULTIPLIER,
        }
    }

    /// Delay before the next attempt, given how many attempts already failed.
    ///
    /// `failures` counts the failure being handled, so the first failure
    /// (`failures == 1`) waits `initial`.
    ///
    /// # Retry Schedule
    ///
    /// With the defaults (500ms initial, 5 minute cap):
    ///
    /// 1. 500ms
    /// 2. 1s
    /// 3. 2s
    /// 4. 4s
    /// 5. ...
    /// 11. 5m (capped)
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        let factor = self.multiplier.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Per-entry count of consecutive failed reconciliations.
///
/// Shared by all reconcile invocations; keyed by `namespace/name`. Entries
/// that stop failing without a later success (for example because they were
/// deleted) are pruned once they have been quiet for twice the maximum delay.
#[derive(Debug)]
pub struct RetryTracker {
    backoff: RequeueBackoff,
    failures: Mutex<HashMap<String, FailureRecord>>,
}

#[derive(Clone, Copy, Debug)]
struct FailureRecord {
    count: u32,
    last_failure: Instant,
}

impl RetryTracker {
    #[must_use]
    pub fn new(backoff: RequeueBackoff) -> Self {
        Self {
            backoff,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure for `key` and returns the delay before the retry.
    ///
    /// Also drops records of other entries that have gone stale.
    pub fn record_failure(&self, key: &str) -> Duration {
        let now = Instant::now();
        let stale_after = self.backoff.max.saturating_mul(2);

        let failures = match self.failures.lock() {
            Ok(mut map) => {
                map.retain(|k, record| {
                    k == key || now.duration_since(record.last_failure) <= stale_after
                });
                let record = map.entry(key.to_string()).or_insert(FailureRecord {
                    count: 0,
                    last_failure: now,
                });
                record.count = record.count.saturating_add(1);
                record.last_failure = now;
                record.count
            }
            // A poisoned map still yields a sane delay.
            Err(_) => 1,
        };
        self.backoff.delay_for(failures)
    }

    /// Forgets past failures of `key`.
    pub fn reset(&self, key: &str) {
        if let Ok(mut map) = self.failures.lock() {
            map.remove(key);
        }
    }

    /// Current consecutive failure count of `key`.
    #[must_use]
    pub fn failures(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .map(|map| map.get(key).map_or(0, |record| record.count))
            .unwrap_or(0)
    }
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(RequeueBackoff::default())
    }
}

/// Determine if an HTTP status code from the API server is transient.
///
/// # Retryable Status Codes
///
/// - **429** (Too Many Requests) - Rate limiting
/// - **5xx** (Server Errors) - Temporary API server issues
#[must_use]
pub fn is_transient_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
