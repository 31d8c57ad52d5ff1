//! Meters: event counts plus exponentially-weighted moving rates.
//!
//! Rates are per second. The moving averages advance in fixed 5-second
//! ticks, applied lazily whenever the meter is marked or read, so meters
//! need no background thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// One exponentially-weighted moving average.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: i64,
    initialized: bool,
}

impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        let alpha = 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp();
        Self {
            alpha,
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn update(&mut self, n: i64) {
        self.uncounted = self.uncounted.wrapping_add(n);
    }

    fn tick(&mut self) {
        let instant = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.initialized = true;
        }
    }

    /// Apply `ticks` ticks with no new events.
    fn decay(&mut self, ticks: u32) {
        if self.initialized {
            self.rate *= (1.0 - self.alpha).powi(ticks as i32);
        } else {
            self.rate = 0.0;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct MeterState {
    count: i64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start: Instant,
    last_tick: Instant,
}

impl MeterState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            m1: Ewma::with_minutes(1.0),
            m5: Ewma::with_minutes(5.0),
            m15: Ewma::with_minutes(15.0),
            start: now,
            last_tick: now,
        }
    }

    fn tick_until(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = (elapsed.as_nanos() / TICK_INTERVAL.as_nanos()) as u64;
        if ticks == 0 {
            return;
        }
        self.last_tick += TICK_INTERVAL * ticks as u32;

        // Events since the last tick land in the first one; the rest are idle.
        for ewma in [&mut self.m1, &mut self.m5, &mut self.m15] {
            ewma.tick();
            if ticks > 1 {
                ewma.decay((ticks - 1).min(u32::MAX as u64) as u32);
            }
        }
    }
}

/// Point-in-time view of a [`Meter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    /// One-minute moving rate.
    pub rate1: f64,
    /// Five-minute moving rate.
    pub rate5: f64,
    /// Fifteen-minute moving rate.
    pub rate15: f64,
    /// Mean rate since the meter was created.
    pub rate_mean: f64,
}

/// Counts events and tracks 1, 5 and 15 minute moving rates.
#[derive(Debug, Clone)]
pub struct Meter(Arc<Mutex<MeterState>>);

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    /// A meter whose mean rate is measured from now.
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub(crate) fn started_at(now: Instant) -> Self {
        Self(Arc::new(Mutex::new(MeterState::new(now))))
    }

    fn lock(&self) -> MutexGuard<'_, MeterState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `n` events.
    pub fn mark(&self, n: i64) {
        self.mark_at(n, Instant::now());
    }

    pub(crate) fn mark_at(&self, n: i64, now: Instant) {
        let mut state = self.lock();
        state.tick_until(now);
        state.count = state.count.wrapping_add(n);
        state.m1.update(n);
        state.m5.update(n);
        state.m15.update(n);
    }

    /// Total events marked.
    pub fn count(&self) -> i64 {
        self.lock().count
    }

    /// Counts and rates as of now.
    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.lock();
        state.tick_until(now);
        let elapsed = now.saturating_duration_since(state.start).as_secs_f64();
        MeterSnapshot {
            count: state.count,
            rate1: state.m1.rate,
            rate5: state.m5.rate,
            rate15: state.m15.rate,
            rate_mean: if elapsed > 0.0 {
                state.count as f64 / elapsed
            } else {
                0.0
            },
        }
    }

    /// Whether both handles point at the same meter.
    pub fn ptr_eq(&self, other: &Meter) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
