//! Time utilities for sandlease
//!
//! Provides both monotonic time (for countdown enforcement) and
//! wall-clock time (for display in snapshots and logs).
//!
//! Monotonic instants are backed by tokio's clock, so tests that pause
//! the runtime clock (`#[tokio::test(start_paused = true)]`) drive every
//! countdown deterministically.

use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::Instant;

/// Get the current local time.
#[allow(clippy::disallowed_methods)] // This is the wrapper every other crate goes through
pub fn now() -> DateTime<Local> {
    chrono::Local::now()
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Represents a point in monotonic time for countdown enforcement.
/// This is immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Whole seconds left of a `total` budget after `elapsed` has passed.
///
/// Rounds down, so a countdown reaches 0 exactly when the budget is spent.
pub fn remaining_whole_seconds(total: Duration, elapsed: Duration) -> u64 {
    total.saturating_sub(elapsed).as_secs()
}

/// Format a countdown as `MM:SS`, or `H:MM:SS` past the hour
pub fn format_countdown(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(59), "00:59");
        assert_eq!(format_countdown(3540), "59:00");
        assert_eq!(format_countdown(86_340), "23:59:00");
    }

    #[test]
    fn test_remaining_whole_seconds() {
        let total = Duration::from_secs(60);
        assert_eq!(remaining_whole_seconds(total, Duration::ZERO), 60);
        assert_eq!(remaining_whole_seconds(total, Duration::from_millis(500)), 59);
        assert_eq!(remaining_whole_seconds(total, Duration::from_secs(60)), 0);
        assert_eq!(remaining_whole_seconds(total, Duration::from_secs(90)), 0);
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_instant_follows_runtime_clock() {
        let t1 = MonotonicInstant::now();
        tokio::time::advance(Duration::from_secs(5)).await;
        let t2 = MonotonicInstant::now();

        assert!(t2 > t1);
        assert_eq!(t1.elapsed(), Duration::from_secs(5));
        assert_eq!(t2.elapsed(), Duration::ZERO);
    }
}
