//! Timers: a duration histogram (nanoseconds) plus a rate meter.

use std::time::{Duration, Instant};

use crate::histogram::{Histogram, HistogramSnapshot};
use crate::meter::{Meter, MeterSnapshot};

/// Point-in-time view of a [`Timer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    /// Durations in nanoseconds.
    pub histogram: HistogramSnapshot,
    pub meter: MeterSnapshot,
}

/// Records how long events take and how often they happen.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event of the given duration.
    pub fn update(&self, elapsed: Duration) {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f` and record how long it took.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.update_since(start);
        result
    }

    pub fn count(&self) -> i64 {
        self.meter.count()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            histogram: self.histogram.snapshot(),
            meter: self.meter.snapshot(),
        }
    }

    pub fn ptr_eq(&self, other: &Timer) -> bool {
        self.histogram.ptr_eq(&other.histogram) && self.meter.ptr_eq(&other.meter)
    }
}
