//! Time-windowed histogram with bounded centroid bins.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::distribution::{Centroid, Distribution, Granularity};
use crate::StreamingHistogram;

/// Tuning knobs for a [`TimedHistogram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramOptions {
    pub granularity: Granularity,
    /// Maximum centroids kept per window.
    pub compression: usize,
    /// Maximum completed windows retained before the oldest is dropped.
    pub max_bins: usize,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Minute,
            compression: 32,
            max_bins: 10,
        }
    }
}

impl HistogramOptions {
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_compression(mut self, compression: usize) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_max_bins(mut self, max_bins: usize) -> Self {
        self.max_bins = max_bins;
        self
    }
}

/// Samples for a single window.
#[derive(Debug)]
struct Bin {
    start_millis: u64,
    /// Ordered by value.
    centroids: Vec<Centroid>,
    count: u64,
}

impl Bin {
    fn new(start_millis: u64) -> Self {
        Self {
            start_millis,
            centroids: Vec::new(),
            count: 0,
        }
    }

    fn add(&mut self, value: f64, compression: usize) {
        self.count += 1;
        match self
            .centroids
            .binary_search_by(|c| c.value.total_cmp(&value))
        {
            Ok(i) => self.centroids[i].count += 1,
            Err(i) => {
                self.centroids.insert(i, Centroid::new(value, 1));
                while self.centroids.len() > compression {
                    self.merge_closest_pair();
                }
            }
        }
    }

    fn merge_closest_pair(&mut self) {
        let Some(i) = (0..self.centroids.len().saturating_sub(1)).min_by(|&a, &b| {
            let gap_a = self.centroids[a + 1].value - self.centroids[a].value;
            let gap_b = self.centroids[b + 1].value - self.centroids[b].value;
            gap_a.total_cmp(&gap_b)
        }) else {
            return;
        };
        let next = self.centroids.remove(i + 1);
        self.centroids[i].merge(&next);
    }

    fn into_distribution(self, granularity: Granularity) -> Distribution {
        Distribution {
            centroids: self.centroids,
            timestamp: (self.start_millis / 1000) as i64,
            granularity,
        }
    }
}

/// Exact statistics across every window ever recorded.
#[derive(Debug, Default)]
struct Lifetime {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug)]
struct State {
    current: Bin,
    prior: VecDeque<Bin>,
    lifetime: Lifetime,
}

/// The default [`StreamingHistogram`]: one bin per granularity window.
#[derive(Debug)]
pub struct TimedHistogram {
    options: HistogramOptions,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl TimedHistogram {
    pub fn new(options: HistogramOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Create a histogram whose windows follow `clock`.
    pub fn with_clock(options: HistogramOptions, clock: Arc<dyn Clock>) -> Self {
        let options = HistogramOptions {
            compression: options.compression.max(1),
            max_bins: options.max_bins.max(1),
            ..options
        };
        let start = options.granularity.align(clock.now_millis());
        Self {
            options,
            clock,
            state: Mutex::new(State {
                current: Bin::new(start),
                prior: VecDeque::new(),
                lifetime: Lifetime::default(),
            }),
        }
    }

    pub fn options(&self) -> HistogramOptions {
        self.options
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state and close the current window if the clock has left it.
    fn lock_rotated(&self) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        let start = self.options.granularity.align(self.clock.now_millis());
        if start > state.current.start_millis {
            let finished = std::mem::replace(&mut state.current, Bin::new(start));
            if finished.count > 0 {
                state.prior.push_back(finished);
                while state.prior.len() > self.options.max_bins {
                    if let Some(dropped) = state.prior.pop_front() {
                        debug!(
                            window_start = dropped.start_millis,
                            samples = dropped.count,
                            "dropping unexported histogram window"
                        );
                    }
                }
            }
        }
        state
    }
}

impl Default for TimedHistogram {
    fn default() -> Self {
        Self::new(HistogramOptions::default())
    }
}

impl StreamingHistogram for TimedHistogram {
    fn update(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        let mut state = self.lock_rotated();
        state.current.add(value, self.options.compression);

        let lifetime = &mut state.lifetime;
        if lifetime.count == 0 {
            lifetime.min = value;
            lifetime.max = value;
        } else {
            lifetime.min = lifetime.min.min(value);
            lifetime.max = lifetime.max.max(value);
        }
        lifetime.count += 1;
        lifetime.sum += value;
    }

    fn count(&self) -> u64 {
        self.lock().lifetime.count
    }

    fn min(&self) -> f64 {
        let state = self.lock();
        if state.lifetime.count == 0 {
            f64::NAN
        } else {
            state.lifetime.min
        }
    }

    fn max(&self) -> f64 {
        let state = self.lock();
        if state.lifetime.count == 0 {
            f64::NAN
        } else {
            state.lifetime.max
        }
    }

    fn sum(&self) -> f64 {
        self.lock().lifetime.sum
    }

    fn mean(&self) -> f64 {
        let state = self.lock();
        if state.lifetime.count == 0 {
            f64::NAN
        } else {
            state.lifetime.sum / state.lifetime.count as f64
        }
    }

    fn quantile(&self, q: f64) -> f64 {
        let state = self.lock_rotated();
        let mut centroids: Vec<Centroid> = state
            .prior
            .iter()
            .chain(std::iter::once(&state.current))
            .flat_map(|bin| bin.centroids.iter().copied())
            .collect();
        drop(state);

        centroids.sort_by(|a, b| a.value.total_cmp(&b.value));
        quantile_of(&centroids, q)
    }

    fn distributions(&self) -> Vec<Distribution> {
        let mut state = self.lock_rotated();
        let granularity = self.options.granularity;
        state
            .prior
            .drain(..)
            .map(|bin| bin.into_distribution(granularity))
            .collect()
    }

    fn granularity(&self) -> Granularity {
        self.options.granularity
    }
}

/// Interpolate the `q` quantile between centroid midpoints.
fn quantile_of(centroids: &[Centroid], q: f64) -> f64 {
    let (Some(first), Some(last)) = (centroids.first(), centroids.last()) else {
        return f64::NAN;
    };
    if q <= 0.0 {
        return first.value;
    }
    if q >= 1.0 {
        return last.value;
    }

    let total: u64 = centroids.iter().map(|c| c.count).sum();
    let target = q * total as f64;
    let mut cumulative = 0.0;
    let mut previous: Option<(f64, f64)> = None;

    for c in centroids {
        let center = cumulative + c.count as f64 / 2.0;
        if target < center {
            return match previous {
                None => c.value,
                Some((prev_center, prev_value)) => {
                    let fraction = (target - prev_center) / (center - prev_center);
                    prev_value + fraction * (c.value - prev_value)
                }
            };
        }
        previous = Some((center, c.value));
        cumulative += c.count as f64;
    }
    last.value
}
