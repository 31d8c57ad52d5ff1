//! pulse-histogram: streaming, time-windowed histograms.
//!
//! Samples are folded into one bin per granularity unit (minute, hour or
//! day). Each bin keeps a bounded list of centroids. Once the clock moves
//! past a bin's window the bin is retained as a completed [`Distribution`]
//! until [`StreamingHistogram::distributions`] drains it for export.
//!
//! # Architecture
//!
//! ```text
//! StreamingHistogram (capability trait)
//!   └── TimedHistogram
//!         ├── current Bin   ← update()
//!         ├── prior Bins    → distributions() (drained once)
//!         └── lifetime stats (count, sum, min, max)
//! ```

use std::fmt;

pub mod clock;
pub mod distribution;
pub mod timed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use distribution::{Centroid, Distribution, Granularity};
pub use timed::{HistogramOptions, TimedHistogram};

/// A streaming histogram that summarizes samples into time windows.
///
/// Implementations must tolerate `update` racing with every read.
pub trait StreamingHistogram: Send + Sync + fmt::Debug {
    fn update(&self, value: f64);

    /// Number of samples recorded over the histogram's lifetime.
    fn count(&self) -> u64;

    /// Smallest sample, NaN when empty.
    fn min(&self) -> f64;

    /// Largest sample, NaN when empty.
    fn max(&self) -> f64;

    fn sum(&self) -> f64;

    /// Lifetime mean, NaN when empty.
    fn mean(&self) -> f64;

    /// Estimate the `q` quantile (0.0..=1.0) over the retained windows.
    fn quantile(&self, q: f64) -> f64;

    /// Completed windows not yet returned by a previous call.
    fn distributions(&self) -> Vec<Distribution>;

    fn granularity(&self) -> Granularity;
}
