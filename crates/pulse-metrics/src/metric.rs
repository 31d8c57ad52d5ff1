//! The closed set of metric types a registry can hold.

use crate::counter::Counter;
use crate::gauge::{FloatGauge, Gauge};
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::timer::Timer;
use crate::windowed::WindowedHistogram;

/// A registered metric. Each variant is a cheap shared handle.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Counter),
    Gauge(Gauge),
    FloatGauge(FloatGauge),
    Meter(Meter),
    Timer(Timer),
    /// Sampling histogram.
    Histogram(Histogram),
    /// Streaming histogram exported as distributions.
    Windowed(WindowedHistogram),
}

impl Metric {
    /// Short type name, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::FloatGauge(_) => "float_gauge",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
            Metric::Histogram(_) => "histogram",
            Metric::Windowed(_) => "windowed_histogram",
        }
    }

    /// Whether both handles point at the same underlying metric.
    pub fn ptr_eq(&self, other: &Metric) -> bool {
        match (self, other) {
            (Metric::Counter(a), Metric::Counter(b)) => a.ptr_eq(b),
            (Metric::Gauge(a), Metric::Gauge(b)) => a.ptr_eq(b),
            (Metric::FloatGauge(a), Metric::FloatGauge(b)) => a.ptr_eq(b),
            (Metric::Meter(a), Metric::Meter(b)) => a.ptr_eq(b),
            (Metric::Timer(a), Metric::Timer(b)) => a.ptr_eq(b),
            (Metric::Histogram(a), Metric::Histogram(b)) => a.ptr_eq(b),
            (Metric::Windowed(a), Metric::Windowed(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Metric::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Gauge> {
        match self {
            Metric::Gauge(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_float_gauge(&self) -> Option<&FloatGauge> {
        match self {
            Metric::FloatGauge(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_meter(&self) -> Option<&Meter> {
        match self {
            Metric::Meter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&Timer> {
        match self {
            Metric::Timer(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Metric::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_windowed(&self) -> Option<&WindowedHistogram> {
        match self {
            Metric::Windowed(h) => Some(h),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Metric {
                fn from(metric: $ty) -> Self {
                    Metric::$variant(metric)
                }
            }
        )*
    };
}

impl_from! {
    Counter => Counter,
    Gauge => Gauge,
    FloatGauge => FloatGauge,
    Meter => Meter,
    Timer => Timer,
    Histogram => Histogram,
    WindowedHistogram => Windowed,
}
