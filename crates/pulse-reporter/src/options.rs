//! Reporter options and their defaults.

use std::time::Duration;

use sysinfo::System;

use pulse_core::{ApplicationTags, ConfigResult, ReporterConfig};

/// Default export interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Percentiles exported for histograms and timers unless overridden.
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

/// Source used when the hostname cannot be read.
pub const FALLBACK_SOURCE: &str = "rust-pulse";

/// How a [`Reporter`](crate::Reporter) names, tags and schedules exports.
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterOptions {
    /// Source (host) sent with every point.
    pub source: String,
    pub interval: Duration,
    /// Prepended to every metric name, joined with `.`.
    pub prefix: String,
    /// Append type suffixes such as `.count` and `.value`.
    pub add_suffix: bool,
    /// Log every failed send at `warn`.
    pub log_errors: bool,
    /// Start the ticker as soon as the reporter is created.
    pub auto_start: bool,
    pub percentiles: Vec<f64>,
    /// Timer durations are divided by this unit before export.
    pub duration_unit: Duration,
    /// Register and refresh process runtime gauges.
    pub runtime_metrics: bool,
    pub application: Option<ApplicationTags>,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            source: hostname(),
            interval: DEFAULT_INTERVAL,
            prefix: String::new(),
            add_suffix: true,
            log_errors: false,
            auto_start: true,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            duration_unit: Duration::from_nanos(1),
            runtime_metrics: false,
            application: None,
        }
    }
}

impl ReporterOptions {
    /// Defaults overlaid with every field set in `config`.
    pub fn from_config(config: &ReporterConfig) -> ConfigResult<Self> {
        config.validate()?;
        let mut options = Self::default();
        if let Some(source) = &config.source {
            options.source = source.clone();
        }
        if let Some(interval) = config.interval()? {
            options.interval = interval;
        }
        if let Some(prefix) = &config.prefix {
            options = options.with_prefix(prefix);
        }
        if let Some(add_suffix) = config.add_suffix {
            options.add_suffix = add_suffix;
        }
        if let Some(log_errors) = config.log_errors {
            options.log_errors = log_errors;
        }
        if let Some(auto_start) = config.auto_start {
            options.auto_start = auto_start;
        }
        if let Some(percentiles) = &config.percentiles {
            options.percentiles = percentiles.clone();
        }
        if let Some(unit) = config.duration_unit()? {
            options.duration_unit = unit;
        }
        if let Some(runtime_metrics) = config.runtime_metrics {
            options.runtime_metrics = runtime_metrics;
        }
        options.application = config.application.clone();
        Ok(options)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// A trailing `.` is dropped.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.strip_suffix('.').unwrap_or(prefix).to_string();
        self
    }

    pub fn with_add_suffix(mut self, add_suffix: bool) -> Self {
        self.add_suffix = add_suffix;
        self
    }

    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    pub fn with_duration_unit(mut self, unit: Duration) -> Self {
        self.duration_unit = unit;
        self
    }

    pub fn with_runtime_metrics(mut self, enabled: bool) -> Self {
        self.runtime_metrics = enabled;
        self
    }

    pub fn with_application(mut self, application: ApplicationTags) -> Self {
        self.application = Some(application);
        self
    }
}

fn hostname() -> String {
    System::host_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_SOURCE.to_string())
}
