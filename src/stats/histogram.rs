//! Session lifetime histogram using HdrHistogram
//!
//! Session tasks live anywhere from milliseconds (a refused connect) to hours
//! (a large streaming write over a slow link), so lifetimes are recorded in
//! microseconds from 1 µs to 24 hours with 3 significant digits.
//!
//! # Example
//!
//! ```
//! use tempest::stats::histogram::DurationHistogram;
//! use std::time::Duration;
//!
//! let mut hist = DurationHistogram::new();
//! hist.record(Duration::from_millis(120));
//! hist.record(Duration::from_millis(480));
//!
//! assert_eq!(hist.len(), 2);
//! assert!(hist.percentile(50.0).is_some());
//! ```

use hdrhistogram::Histogram;
use std::time::Duration;

/// Largest trackable value: 24 hours in microseconds
const MAX_MICROS: u64 = 24 * 3600 * 1_000_000;

/// Duration histogram wrapper
#[derive(Debug, Clone)]
pub struct DurationHistogram {
    histogram: Histogram<u64>,
}

impl DurationHistogram {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_MICROS, 3)
            .expect("Failed to create histogram with valid bounds");
        Self { histogram }
    }

    /// Record a duration, clamped to the trackable range
    #[inline]
    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(MAX_MICROS);
        let _ = self.histogram.record(micros.clamp(1, MAX_MICROS));
    }

    /// Value at `percentile` (0.0 - 100.0), `None` when empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.value_at_percentile(percentile)))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.max()))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }
}

impl Default for DurationHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram() {
        let hist = DurationHistogram::new();
        assert!(hist.is_empty());
        assert!(hist.percentile(50.0).is_none());
        assert!(hist.max().is_none());
    }

    #[test]
    fn test_percentiles() {
        let mut hist = DurationHistogram::new();
        for i in 1..=100 {
            hist.record(Duration::from_millis(i * 10));
        }

        let p50 = hist.percentile(50.0).unwrap();
        let p99 = hist.percentile(99.0).unwrap();

        // p50 around 500ms, p99 around 990ms
        assert!(p50.as_millis() >= 495 && p50.as_millis() <= 505);
        assert!(p99.as_millis() >= 985 && p99.as_millis() <= 995);
    }

    #[test]
    fn test_zero_duration_clamped() {
        let mut hist = DurationHistogram::new();
        hist.record(Duration::ZERO);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.max(), Some(Duration::from_micros(1)));
    }

    #[test]
    fn test_huge_duration_clamped() {
        let mut hist = DurationHistogram::new();
        hist.record(Duration::from_secs(10 * 24 * 3600));
        let max = hist.max().unwrap();
        assert!(max >= Duration::from_secs(23 * 3600));
    }
}
