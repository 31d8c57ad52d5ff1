//! Error types for metric registration and histogram access.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors returned by [`Registry`](crate::Registry) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate metric: {0}")]
    Duplicate(String),

    #[error("metric {key:?} has a type this registry cannot hold: {kind}")]
    Unsupported { key: String, kind: &'static str },
}

/// Errors returned by histogram operations a variant cannot perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistogramError {
    #[error("{0} is not supported on a windowed histogram")]
    Unsupported(&'static str),
}
