//! Classic sampling histograms backed by a uniform reservoir.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

/// Default reservoir size.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Read access shared by every histogram flavor.
pub trait HistogramRead {
    /// Number of values recorded.
    fn count(&self) -> i64;
    fn min(&self) -> i64;
    fn max(&self) -> i64;
    fn sum(&self) -> i64;
    fn mean(&self) -> f64;
    fn percentile(&self, p: f64) -> f64;

    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|&p| self.percentile(p)).collect()
    }
}

/// Fixed-size uniform random sample (Vitter's algorithm R).
#[derive(Debug)]
struct UniformSample {
    reservoir_size: usize,
    count: u64,
    values: Vec<i64>,
}

impl UniformSample {
    fn new(reservoir_size: usize) -> Self {
        Self {
            reservoir_size: reservoir_size.max(1),
            count: 0,
            values: Vec::new(),
        }
    }

    fn update(&mut self, value: i64) {
        self.count += 1;
        if self.values.len() < self.reservoir_size {
            self.values.push(value);
            return;
        }
        let slot = rand::thread_rng().gen_range(0..self.count);
        if (slot as usize) < self.reservoir_size {
            self.values[slot as usize] = value;
        }
    }

    fn clear(&mut self) {
        self.count = 0;
        self.values.clear();
    }
}

/// Immutable view of a histogram's sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    count: i64,
    /// Sorted ascending.
    values: Vec<i64>,
}

impl HistogramSnapshot {
    pub fn new(count: i64, mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { count, values }
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Population variance of the sampled values; 0 when empty.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let squares: f64 = self
            .values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        squares / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl HistogramRead for HistogramSnapshot {
    fn count(&self) -> i64 {
        self.count
    }

    fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Wraps on overflow, like 64-bit integer arithmetic elsewhere.
    fn sum(&self) -> i64 {
        self.values.iter().fold(0i64, |acc, &v| acc.wrapping_add(v))
    }

    /// NaN when empty. Accumulated in 128 bits so extreme samples stay exact.
    fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        let total: i128 = self.values.iter().map(|&v| i128::from(v)).sum();
        total as f64 / self.values.len() as f64
    }

    /// Linear interpolation at rank `p * (n + 1)`.
    fn percentile(&self, p: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let pos = p * (n as f64 + 1.0);
        if pos < 1.0 {
            return self.values[0] as f64;
        }
        if pos >= n as f64 {
            return self.values[n - 1] as f64;
        }
        let lower = self.values[pos as usize - 1] as f64;
        let upper = self.values[pos as usize] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }
}

/// A sampling histogram. Clones share the same sample.
#[derive(Debug, Clone)]
pub struct Histogram(Arc<Mutex<UniformSample>>);

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_reservoir(DEFAULT_RESERVOIR_SIZE)
    }

    pub fn with_reservoir(reservoir_size: usize) -> Self {
        Self(Arc::new(Mutex::new(UniformSample::new(reservoir_size))))
    }

    fn lock(&self) -> MutexGuard<'_, UniformSample> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(&self, value: i64) {
        self.lock().update(value);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let sample = self.lock();
        HistogramSnapshot::new(sample.count as i64, sample.values.clone())
    }

    pub fn std_dev(&self) -> f64 {
        self.snapshot().std_dev()
    }

    pub fn variance(&self) -> f64 {
        self.snapshot().variance()
    }

    pub fn ptr_eq(&self, other: &Histogram) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl HistogramRead for Histogram {
    fn count(&self) -> i64 {
        self.lock().count as i64
    }

    fn min(&self) -> i64 {
        self.snapshot().min()
    }

    fn max(&self) -> i64 {
        self.snapshot().max()
    }

    fn sum(&self) -> i64 {
        self.snapshot().sum()
    }

    fn mean(&self) -> f64 {
        self.snapshot().mean()
    }

    fn percentile(&self, p: f64) -> f64 {
        self.snapshot().percentile(p)
    }

    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        self.snapshot().percentiles(ps)
    }
}
