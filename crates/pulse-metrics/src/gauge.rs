//! Point-in-time gauges.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// An integer gauge holding the last value set.
#[derive(Debug, Clone, Default)]
pub struct Gauge(Arc<AtomicI64>);

impl Gauge {
    /// A gauge reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value.
    pub fn update(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// The last value set.
    pub fn value(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether both handles point at the same gauge.
    pub fn ptr_eq(&self, other: &Gauge) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A floating-point gauge, stored as raw bits.
#[derive(Debug, Clone, Default)]
pub struct FloatGauge(Arc<AtomicU64>);

impl FloatGauge {
    /// A gauge reading `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value.
    pub fn update(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// The last value set.
    pub fn value(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Whether both handles point at the same gauge.
    pub fn ptr_eq(&self, other: &FloatGauge) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
