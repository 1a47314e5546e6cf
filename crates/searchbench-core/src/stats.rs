//! Latency accumulation and summary statistics.
//!
//! Percentiles use the nearest-rank method over a sorted copy of the
//! samples. High percentiles degrade to the maximum when the sample
//! count is too small for the tail to be meaningful: p99 needs at
//! least 100 samples, p95 at least 20.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum sample count before p99 is computed rather than degraded to max.
pub const P99_MIN_SAMPLES: usize = 100;
/// Minimum sample count before p95 is computed rather than degraded to max.
pub const P95_MIN_SAMPLES: usize = 20;

/// Summary of a latency distribution, all values in milliseconds.
/// An empty distribution summarizes to all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Collects per-operation latencies during a benchmark run.
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    samples_ms: Vec<f64>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_ms(&mut self, ms: f64) {
        self.samples_ms.push(ms);
    }

    pub fn len(&self) -> usize {
        self.samples_ms.len()
    }

    /// Raw samples in arrival order, milliseconds.
    pub fn samples_ms(&self) -> &[f64] {
        &self.samples_ms
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ms.is_empty()
    }

    pub fn summarize(&self) -> LatencySummary {
        summarize(&self.samples_ms)
    }
}

/// Summarize a latency distribution given in milliseconds.
pub fn summarize(samples_ms: &[f64]) -> LatencySummary {
    if samples_ms.is_empty() {
        return LatencySummary::default();
    }
    let mut sorted = samples_ms.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len();
    LatencySummary {
        mean_ms: sorted.iter().sum::<f64>() / n as f64,
        median_ms: median_of_sorted(&sorted),
        p95_ms: percentile_of_sorted(&sorted, 95, P95_MIN_SAMPLES),
        p99_ms: percentile_of_sorted(&sorted, 99, P99_MIN_SAMPLES),
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}

/// Median of a sorted slice; even-length inputs average the two middles.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Nearest-rank percentile of a sorted slice. Falls back to the maximum
/// when fewer than `min_samples` samples are available.
fn percentile_of_sorted(sorted: &[f64], pct: usize, min_samples: usize) -> f64 {
    let n = sorted.len();
    if n < min_samples {
        return sorted[n - 1];
    }
    let idx = (n * pct / 100).min(n - 1);
    sorted[idx]
}
