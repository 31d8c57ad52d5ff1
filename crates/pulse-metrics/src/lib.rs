//! pulse-metrics: metric primitives and the plain registry.
//!
//! Every primitive is a cheap handle over shared state: cloning a
//! [`Counter`] or a [`Timer`] yields another view of the same metric, so
//! producers and the reporter can hold it concurrently.
//!
//! | Type | Exported as |
//! |------|-------------|
//! | [`Counter`] | `.count` or a delta counter |
//! | [`Gauge`], [`FloatGauge`] | `.value` |
//! | [`Meter`] | count plus moving rates |
//! | [`Timer`] | duration statistics plus moving rates |
//! | [`Histogram`] | sampled statistics and percentiles |
//! | [`WindowedHistogram`] | completed distributions |

pub mod counter;
pub mod error;
pub mod gauge;
pub mod histogram;
pub mod meter;
pub mod metric;
pub mod registry;
pub mod timer;
pub mod windowed;

pub use counter::Counter;
pub use error::{HistogramError, RegistryError, RegistryResult};
pub use gauge::{FloatGauge, Gauge};
pub use histogram::{DEFAULT_RESERVOIR_SIZE, Histogram, HistogramRead, HistogramSnapshot};
pub use meter::{Meter, MeterSnapshot};
pub use metric::Metric;
pub use registry::{Registry, StandardRegistry};
pub use timer::{Timer, TimerSnapshot};
pub use windowed::WindowedHistogram;

pub use pulse_histogram::{Centroid, Distribution, Granularity, HistogramOptions};
