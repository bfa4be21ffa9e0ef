//! Backend query latency, kept in an in-memory histogram.
//! The alerts feed records one sample per backend call; /stats/latency reads them.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::error::{AppError, Result};

/// Values stored in microseconds, 1us to 100s at 3 significant figures.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

impl LatencyStats {
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    /// Samples above the upper bound are clamped to it.
    pub fn record(&self, d: Duration) {
        let us = u64::try_from(d.as_micros())
            .unwrap_or(u64::MAX)
            .clamp(1, 100_000_000);
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Fails only if a recorder panicked while holding the histogram.
    pub fn snapshot(&self) -> Result<LatencyResponse> {
        let h = self
            .inner
            .lock()
            .map_err(|_| AppError::State("latency histogram lock poisoned".to_string()))?;
        let at = |q: f64| (h.len() > 0).then(|| h.value_at_quantile(q) as f64 / 1_000.0);
        Ok(LatencyResponse {
            p50_ms: at(0.5),
            p95_ms: at(0.95),
            p99_ms: at(0.99),
            sample_count: h.len(),
        })
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_reports_no_percentiles() {
        let stats = LatencyStats::new();
        assert_eq!(
            stats.snapshot().unwrap(),
            LatencyResponse {
                p50_ms: None,
                p95_ms: None,
                p99_ms: None,
                sample_count: 0,
            }
        );
    }

    #[test]
    fn percentiles_are_reported_in_milliseconds() {
        let stats = LatencyStats::new();
        for _ in 0..100 {
            stats.record(Duration::from_millis(20));
        }
        let snap = stats.snapshot().unwrap();
        assert_eq!(snap.sample_count, 100);
        let p50 = snap.p50_ms.unwrap();
        assert!((p50 - 20.0).abs() < 0.1, "p50 was {p50}");
    }

    #[test]
    fn zero_and_huge_samples_are_clamped() {
        let stats = LatencyStats::new();
        stats.record(Duration::ZERO);
        stats.record(Duration::from_secs(1_000));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn poisoned_histogram_is_an_error() {
        let stats = std::sync::Arc::new(LatencyStats::new());
        let holder = std::sync::Arc::clone(&stats);
        let _ = std::thread::spawn(move || {
            let _guard = holder.inner.lock().unwrap();
            panic!("recorder died mid-update");
        })
        .join();

        assert!(matches!(stats.snapshot(), Err(AppError::State(_))));
    }
}
