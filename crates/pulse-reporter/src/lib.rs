//! pulse-reporter: the reporting engine.
//!
//! A [`Reporter`] scans a metric registry on a fixed interval (and on
//! demand) and turns each metric into points for a [`MetricSender`]:
//!
//! | Metric | Points |
//! |--------|--------|
//! | counter | `name.count`, or `∆name.count` as a delta |
//! | gauge | `name.value` |
//! | histogram | count, min, max, mean, std-dev, one per percentile |
//! | meter | count, one-, five-, fifteen-minute and mean rates |
//! | timer | histogram points in the duration unit, then the four rates |
//! | windowed histogram | one distribution per completed window |
//!
//! Send failures are counted, never retried; [`Reporter::errors_count`]
//! is the only failure signal.

pub mod error;
pub mod naming;
pub mod options;
pub mod reporter;
pub mod runtime;
pub mod sender;

pub use error::{ReporterError, ReporterResult};
pub use naming::{ALT_DELTA_PREFIX, DELTA_PREFIX, delta_counter_name, has_delta_prefix};
pub use options::{DEFAULT_INTERVAL, DEFAULT_PERCENTILES, ReporterOptions};
pub use reporter::Reporter;
pub use runtime::RuntimeMetrics;
pub use sender::{MetricSender, SendError, SendResult};
