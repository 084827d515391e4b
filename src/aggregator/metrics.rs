//! Grouped duration statistics and growth-rate helpers.
//!
//! Durations are accumulated from microsecond trace values and reported in
//! milliseconds, which is what every analyzer's details expose.

use crate::utils::config::{MICROS_PER_MS, MICROS_PER_SEC};
use serde::Serialize;
use std::cmp::Ordering;

/// Count / total / average for a group of timed events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationStats {
    pub count: usize,
    pub total_duration_ms: f64,
    pub average_duration_ms: f64,
}

impl DurationStats {
    /// Record one event of `duration_us` microseconds
    pub fn record(&mut self, duration_us: f64) {
        self.count += 1;
        self.total_duration_ms += duration_us / MICROS_PER_MS;
        self.average_duration_ms = self.total_duration_ms / self.count as f64;
    }

    /// Human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Count: {} | Total: {:.2}ms | Avg: {:.2}ms",
            self.count, self.total_duration_ms, self.average_duration_ms
        )
    }
}

/// Sort with `compare` and keep the first `n`
pub fn top_n<T, F>(mut items: Vec<T>, n: usize, compare: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    items.sort_by(compare);
    items.truncate(n);
    items
}

/// Per-second rate of change between two `(timestamp_us, value)` readings
///
/// Zero when both readings share a timestamp.
pub fn growth_rate(first: (f64, f64), last: (f64, f64)) -> f64 {
    let elapsed_secs = (last.0 - first.0) / MICROS_PER_SEC;
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (last.1 - first.1) / elapsed_secs
}

/// Microseconds → milliseconds
pub fn to_ms(micros: f64) -> f64 {
    micros / MICROS_PER_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_stats() {
        let mut stats = DurationStats::default();
        stats.record(2_000.0);
        stats.record(4_000.0);

        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_duration_ms, 6.0);
        assert_eq!(stats.average_duration_ms, 3.0);
        assert!(stats.summary().contains("Count: 2"));
    }

    #[test]
    fn test_top_n() {
        let ranked = top_n(vec![3, 9, 1, 7], 2, |a, b| b.cmp(a));
        assert_eq!(ranked, vec![9, 7]);
    }

    #[test]
    fn test_growth_rate() {
        // 200 KB over 10 seconds
        let rate = growth_rate((0.0, 0.0), (10_000_000.0, 204_800.0));
        assert_eq!(rate, 20_480.0);
        assert_eq!(growth_rate((5.0, 1.0), (5.0, 100.0)), 0.0);
    }
}
