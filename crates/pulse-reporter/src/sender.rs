//! The sender capability: where exported points go.
//!
//! The engine never talks to a backend directly. It hands every point,
//! delta and distribution to a [`MetricSender`] and only counts failures.
//! Transport, batching and retries belong to the sender.

use std::collections::HashSet;

use thiserror::Error;

use pulse_core::Tags;
use pulse_histogram::{Centroid, Granularity};

/// Result type alias for sender calls.
pub type SendResult<T> = Result<T, SendError>;

/// Failure reported by a [`MetricSender`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("invalid point {name:?}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("sender is closed")]
    Closed,
}

/// Accepts pre-formed points for a telemetry backend.
///
/// Called from the blocking pool; implementations may block briefly but
/// should not retry.
pub trait MetricSender: Send + Sync {
    /// Send one point. A `timestamp` of 0 means "now".
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: i64,
        source: &str,
        tags: &Tags,
    ) -> SendResult<()>;

    /// Send the change in a delta counter since the previous export.
    fn send_delta_counter(&self, name: &str, value: f64, source: &str, tags: &Tags)
    -> SendResult<()>;

    /// Send one completed distribution window.
    fn send_distribution(
        &self,
        name: &str,
        centroids: &[Centroid],
        granularities: &HashSet<Granularity>,
        timestamp: i64,
        source: &str,
        tags: &Tags,
    ) -> SendResult<()>;

    /// Flush and release resources. Called once, after the final report.
    fn close(&self);
}
