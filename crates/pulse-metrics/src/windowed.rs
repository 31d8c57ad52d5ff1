//! Adapter exposing a streaming histogram through the classic histogram
//! read contract.
//!
//! A [`WindowedHistogram`] answers `count`/`min`/`max`/`sum`/`mean`/
//! `percentile` like a sampling [`Histogram`](crate::Histogram), and also
//! hands out completed distributions for direct export. It has no in-memory
//! sample, so sample-based operations return
//! [`HistogramError::Unsupported`].

use std::sync::Arc;

use pulse_histogram::{
    Distribution, Granularity, HistogramOptions, StreamingHistogram, TimedHistogram,
};

use crate::error::HistogramError;
use crate::histogram::{HistogramRead, HistogramSnapshot};

/// Histogram whose samples are batched into time windows.
#[derive(Debug, Clone)]
pub struct WindowedHistogram {
    inner: Arc<dyn StreamingHistogram>,
}

impl Default for WindowedHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowedHistogram {
    /// A minute-granularity histogram on the system clock.
    pub fn new() -> Self {
        Self::with_options(HistogramOptions::default())
    }

    pub fn with_options(options: HistogramOptions) -> Self {
        Self::from_streaming(Arc::new(TimedHistogram::new(options)))
    }

    /// Wrap any streaming histogram implementation.
    pub fn from_streaming(inner: Arc<dyn StreamingHistogram>) -> Self {
        Self { inner }
    }

    pub fn update(&self, value: i64) {
        self.inner.update(value as f64);
    }

    /// Completed windows since the previous call. Each is returned once.
    pub fn distributions(&self) -> Vec<Distribution> {
        self.inner.distributions()
    }

    pub fn granularity(&self) -> Granularity {
        self.inner.granularity()
    }

    pub fn clear(&self) -> Result<(), HistogramError> {
        Err(HistogramError::Unsupported("clear"))
    }

    pub fn std_dev(&self) -> Result<f64, HistogramError> {
        Err(HistogramError::Unsupported("std_dev"))
    }

    pub fn variance(&self) -> Result<f64, HistogramError> {
        Err(HistogramError::Unsupported("variance"))
    }

    pub fn sample(&self) -> Result<Vec<i64>, HistogramError> {
        Err(HistogramError::Unsupported("sample"))
    }

    pub fn snapshot(&self) -> Result<HistogramSnapshot, HistogramError> {
        Err(HistogramError::Unsupported("snapshot"))
    }

    pub fn ptr_eq(&self, other: &WindowedHistogram) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// Empty histograms report 0 for count, sum, min and max (NaN casts to 0)
// and NaN for the mean.
impl HistogramRead for WindowedHistogram {
    fn count(&self) -> i64 {
        self.inner.count() as i64
    }

    fn min(&self) -> i64 {
        self.inner.min() as i64
    }

    fn max(&self) -> i64 {
        self.inner.max() as i64
    }

    fn sum(&self) -> i64 {
        self.inner.sum() as i64
    }

    fn mean(&self) -> f64 {
        self.inner.mean()
    }

    fn percentile(&self, p: f64) -> f64 {
        self.inner.quantile(p)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pulse_histogram::ManualClock;

    use super::*;

    fn manual() -> (WindowedHistogram, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_040_000));
        let timed = TimedHistogram::with_clock(
            HistogramOptions::default().with_compression(5),
            clock.clone(),
        );
        (WindowedHistogram::from_streaming(Arc::new(timed)), clock)
    }

    #[test]
    fn read_contract_matches_sampling_histogram() {
        let (pow10, clock) = manual();
        for v in [0, 1, 10, 10, 100, 1000, 10000, 10000, 100000] {
            pow10.update(v);
        }
        clock.advance(Duration::from_secs(60));

        assert_eq!(pow10.count(), 9);
        assert_eq!(pow10.max(), 100000);
        assert_eq!(pow10.min(), 0);
        assert_eq!(pow10.sum(), 121121);
        assert!((pow10.mean() - 13457.888888888889).abs() < 1e-9);
    }

    #[test]
    fn empty_policy() {
        let (empty, _) = manual();
        assert_eq!(empty.count(), 0);
        assert_eq!(empty.min(), 0);
        assert_eq!(empty.max(), 0);
        assert_eq!(empty.sum(), 0);
        assert!(empty.mean().is_nan());
    }

    #[test]
    fn sample_operations_are_unsupported() {
        let (h, _) = manual();
        assert_eq!(h.clear(), Err(HistogramError::Unsupported("clear")));
        assert_eq!(h.std_dev(), Err(HistogramError::Unsupported("std_dev")));
        assert_eq!(h.variance(), Err(HistogramError::Unsupported("variance")));
        assert_eq!(h.sample(), Err(HistogramError::Unsupported("sample")));
        assert_eq!(h.snapshot(), Err(HistogramError::Unsupported("snapshot")));
    }

    #[test]
    fn distributions_after_rotation() {
        let (h, clock) = manual();
        for i in 0..1000 {
            h.update(i);
        }
        assert!(h.distributions().is_empty());
        clock.advance(Duration::from_secs(60));

        let dists = h.distributions();
        assert_eq!(dists.len(), 1);
        assert_eq!(dists[0].centroids.len(), 5);
        assert_eq!(h.granularity(), Granularity::Minute);
        assert!(h.distributions().is_empty());
    }

    #[test]
    fn percentiles_use_streaming_quantiles() {
        let (h, _) = manual();
        for i in 1..=100 {
            h.update(i);
        }
        let ps = h.percentiles(&[0.0, 0.5, 1.0]);
        assert!(ps[0] <= ps[1] && ps[1] <= ps[2]);
        assert!((30.0..=70.0).contains(&ps[1]), "median was {}", ps[1]);
    }
}
