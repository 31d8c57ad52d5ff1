//! Reporter construction errors.

use thiserror::Error;

use pulse_metrics::RegistryError;

/// Result type alias for reporter construction.
pub type ReporterResult<T> = Result<T, ReporterError>;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("reporter must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("invalid reporter option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: &'static str,
    },

    #[error("failed to register runtime metrics: {0}")]
    Registry(#[from] RegistryError),
}
