//! Distribution payloads produced by completed histogram windows.

use std::fmt;
use std::time::Duration;

/// A cluster of samples: their mean value and how many there were.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub value: f64,
    pub count: u64,
}

impl Centroid {
    pub fn new(value: f64, count: u64) -> Self {
        Self { value, count }
    }

    /// Fold `other` into this centroid, keeping the weighted mean.
    pub fn merge(&mut self, other: &Centroid) {
        let total = self.count + other.count;
        if total == 0 {
            return;
        }
        self.value = (self.value * self.count as f64 + other.value * other.count as f64)
            / total as f64;
        self.count = total;
    }
}

/// Window size of a streaming histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    pub fn duration(self) -> Duration {
        match self {
            Granularity::Minute => Duration::from_secs(60),
            Granularity::Hour => Duration::from_secs(3600),
            Granularity::Day => Duration::from_secs(86_400),
        }
    }

    pub fn millis(self) -> u64 {
        self.duration().as_millis() as u64
    }

    /// Start of the window containing `millis`.
    pub fn align(self, millis: u64) -> u64 {
        millis - millis % self.millis()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Minute => f.write_str("minute"),
            Granularity::Hour => f.write_str("hour"),
            Granularity::Day => f.write_str("day"),
        }
    }
}

/// One completed window of a streaming histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    /// Centroids ordered by value.
    pub centroids: Vec<Centroid>,
    /// Window start, unix seconds.
    pub timestamp: i64,
    pub granularity: Granularity,
}

impl Distribution {
    /// Total number of samples in the window.
    pub fn count(&self) -> u64 {
        self.centroids.iter().map(|c| c.count).sum()
    }
}
