// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{is_transient_status, RequeueBackoff, RetryTracker};
    use std::time::Duration;

    /// Test that backoff configuration has expected values
    #[test]
    fn test_backoff_configuration() {
        let backoff = RequeueBackoff::default();

        assert_eq!(
            backoff.initial,
            Duration::from_millis(500),
            "Initial delay should be 500ms"
        );
        assert_eq!(
            backoff.max,
            Duration::from_secs(300),
            "Max delay should be 5 minutes"
        );
        assert_eq!(backoff.multiplier, 2, "Multiplier should be 2");
    }

    /// Test the exponential growth of the schedule
    #[test]
    fn test_backoff_doubles_per_failure() {
        let backoff = RequeueBackoff::default();

        assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(10), Duration::from_secs(256));
    }

    /// Test that the schedule never exceeds the cap, even for huge counts
    #[test]
    fn test_backoff_is_capped() {
        let backoff = RequeueBackoff::default();

        assert_eq!(backoff.delay_for(11), Duration::from_secs(300));
        assert_eq!(backoff.delay_for(64), Duration::from_secs(300));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(300));
    }

    /// Zero failures is treated like the first failure
    #[test]
    fn test_backoff_zero_failures() {
        let backoff = RequeueBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
    }

    #[test]
    fn test_tracker_counts_per_entry() {
        let tracker = RetryTracker::new(RequeueBackoff::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
        ));

        assert_eq!(tracker.record_failure("shop/a"), Duration::from_millis(100));
        assert_eq!(tracker.record_failure("shop/a"), Duration::from_millis(200));
        assert_eq!(tracker.record_failure("shop/b"), Duration::from_millis(100));
        assert_eq!(tracker.failures("shop/a"), 2);
        assert_eq!(tracker.failures("shop/b"), 1);
    }

    #[test]
    fn test_tracker_reset_restarts_schedule() {
        let tracker = RetryTracker::default();

        tracker.record_failure("shop/a");
        tracker.record_failure("shop/a");
        tracker.reset("shop/a");

        assert_eq!(tracker.failures("shop/a"), 0);
        assert_eq!(tracker.record_failure("shop/a"), Duration::from_millis(500));
    }

    #[test]
    fn test_tracker_prunes_entries_that_stopped_failing() {
        let tracker = RetryTracker::new(RequeueBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
        ));

        tracker.record_failure("shop/deleted");
        assert_eq!(tracker.failures("shop/deleted"), 1);

        std::thread::sleep(Duration::from_millis(50));
        tracker.record_failure("shop/live");

        assert_eq!(tracker.failures("shop/deleted"), 0);
        assert_eq!(tracker.failures("shop/live"), 1);
    }

    #[test]
    fn test_tracker_keeps_recently_failing_entries() {
        let tracker = RetryTracker::default();

        tracker.record_failure("shop/a");
        tracker.record_failure("shop/b");
        tracker.record_failure("shop/a");

        assert_eq!(tracker.failures("shop/a"), 2);
        assert_eq!(tracker.failures("shop/b"), 1);
    }

    /// Test transient status classification
    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(429), "429 should be transient");
        assert!(is_transient_status(500), "500 should be transient");
        assert!(is_transient_status(503), "503 should be transient");
        assert!(is_transient_status(599), "599 should be transient");

        assert!(!is_transient_status(400), "400 should not be transient");
        assert!(!is_transient_status(404), "404 should not be transient");
        assert!(!is_transient_status(409), "409 should not be transient");
        assert!(!is_transient_status(600), "600 should not be transient");
    }
}
