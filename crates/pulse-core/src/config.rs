//! Reporter configuration file parser.
//!
//! ```toml
//! source = "web-01"
//! interval = "10s"
//! prefix = "some.prefix"
//! log_errors = true
//!
//! [application]
//! application = "checkout"
//! service = "api"
//! ```
//!
//! Every field is optional; unset fields keep the reporter defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tags::ApplicationTags;

/// Result type alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while parsing or validating a reporter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for `{field}`: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("`{0}` must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("percentile out of range (0, 1]: {0}")]
    InvalidPercentile(f64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Source (host) reported with every point. Defaults to the hostname.
    pub source: Option<String>,
    /// Export interval, e.g. `"5s"`.
    pub interval: Option<String>,
    /// Prefix prepended to every metric name.
    pub prefix: Option<String>,
    /// Append type suffixes (`.count`, `.value`).
    pub add_suffix: Option<bool>,
    pub log_errors: Option<bool>,
    pub auto_start: Option<bool>,
    /// Percentiles exported for histograms and timers, in (0, 1].
    pub percentiles: Option<Vec<f64>>,
    /// Unit timer durations are divided by, e.g. `"1ms"`.
    pub duration_unit: Option<String>,
    /// Register process runtime gauges.
    pub runtime_metrics: Option<bool>,
    pub application: Option<ApplicationTags>,
}

impl ReporterConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Parse and validate a configuration document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ReporterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn interval(&self) -> ConfigResult<Option<Duration>> {
        parse_field("interval", self.interval.as_deref())
    }

    pub fn duration_unit(&self) -> ConfigResult<Option<Duration>> {
        parse_field("duration_unit", self.duration_unit.as_deref())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.interval()?;
        self.duration_unit()?;
        for &p in self.percentiles.iter().flatten() {
            if !(p > 0.0 && p <= 1.0) {
                return Err(ConfigError::InvalidPercentile(p));
            }
        }
        Ok(())
    }
}

fn parse_field(field: &'static str, value: Option<&str>) -> ConfigResult<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let duration = parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })?;
    if duration.is_zero() {
        return Err(ConfigError::ZeroDuration(field));
    }
    Ok(Some(duration))
}

/// Parse a human duration: `"5s"`, `"500ms"`, `"250us"`, `"1ns"`, `"2m"`,
/// `"1h"`. A bare number is seconds. Values that overflow are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(n) = s.strip_suffix("ns") {
        n.parse::<u64>().ok().map(Duration::from_nanos)
    } else if let Some(n) = s.strip_suffix("us") {
        n.parse::<u64>().ok().map(Duration::from_micros)
    } else if let Some(n) = s.strip_suffix("ms") {
        n.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(n) = s.strip_suffix('s') {
        n.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(n) = s.strip_suffix('m') {
        n.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(n) = s.strip_suffix('h') {
        n.parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
