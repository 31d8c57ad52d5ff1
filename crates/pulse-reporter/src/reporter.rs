//! Reporting engine: periodic export of a registry through a sender.
//!
//! A [`Reporter`] owns one background task. The task ticks at the configured
//! interval and, while running, hands each export pass to the blocking pool.
//! `start`, `stop` and `close` reach the task through a bounded command
//! queue. Every pass, scheduled or manual, runs under the same mutex, so at
//! most one pass scans the registry at a time.
//!
//! ```text
//! Created ──(auto_start | start)──► Running ◄──► Stopped
//!                                      │            │
//!                                      └──(close)───┴──► final report ─► sender.close() ─► Closed
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use pulse_core::{Tags, decode_key, merge_tags};
use pulse_metrics::{
    Counter, HistogramRead, HistogramSnapshot, Metric, MeterSnapshot, Registry, RegistryResult,
    TimerSnapshot, WindowedHistogram,
};
use pulse_registry::{TaggedRegistryExt, default_registry};

use crate::error::{ReporterError, ReporterResult};
use crate::naming::{
    DELTA_PREFIX, NameFormatter, has_delta_prefix, percentile_key, strip_delta_prefix,
};
use crate::options::ReporterOptions;
use crate::runtime::RuntimeMetrics;
use crate::sender::{MetricSender, SendResult};

const COMMAND_QUEUE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Close,
}

/// Periodically exports every metric in a registry.
pub struct Reporter {
    engine: Arc<Engine>,
    commands: mpsc::Sender<Command>,
    /// Background task; taken by the first `close`.
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Reporter {
    /// Create a reporter over an explicit registry.
    ///
    /// Must be called inside a Tokio runtime. Dropping the reporter without
    /// calling [`close`](Self::close) still runs the final report and closes
    /// the sender, as long as the runtime is alive.
    pub fn new(
        sender: Arc<dyn MetricSender>,
        registry: Arc<dyn Registry>,
        options: ReporterOptions,
    ) -> ReporterResult<Self> {
        validate(&options)?;
        let handle = Handle::try_current().map_err(|_| ReporterError::NoRuntime)?;

        let runtime = if options.runtime_metrics {
            Some(RuntimeMetrics::register(registry.as_ref())?)
        } else {
            None
        };

        let engine = Arc::new(Engine {
            sender,
            registry,
            names: NameFormatter::new(&options.prefix, options.add_suffix),
            app_tags: options
                .application
                .as_ref()
                .map(|app| app.to_tags())
                .unwrap_or_default(),
            source: options.source.clone(),
            percentiles: options.percentiles.clone(),
            unit_nanos: i64::try_from(options.duration_unit.as_nanos()).unwrap_or(i64::MAX),
            log_errors: options.log_errors,
            runtime,
            pass: Mutex::new(()),
            errors: AtomicU64::new(0),
        });

        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let task = handle.spawn(run(
            Arc::clone(&engine),
            rx,
            options.interval,
            options.auto_start,
        ));

        info!(
            source = %options.source,
            interval_ms = options.interval.as_millis() as u64,
            auto_start = options.auto_start,
            "reporter created"
        );

        Ok(Self {
            engine,
            commands,
            task: tokio::sync::Mutex::new(Some(task)),
        })
    }

    /// Create a reporter over the process-wide [`default_registry`].
    pub fn with_default_registry(
        sender: Arc<dyn MetricSender>,
        options: ReporterOptions,
    ) -> ReporterResult<Self> {
        Self::new(sender, default_registry(), options)
    }

    /// Begin scheduled exports. No-op if already running.
    pub async fn start(&self) {
        self.command(Command::Start).await;
    }

    /// Pause scheduled exports. Manual [`report`](Self::report) still works.
    pub async fn stop(&self) {
        self.command(Command::Stop).await;
    }

    /// Stop the background task after one final report, then close the sender.
    ///
    /// Waits for any in-flight scheduled pass first. Later calls return once
    /// the first close has finished.
    pub async fn close(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };
        if self.commands.send(Command::Close).await.is_err() {
            debug!("reporter task already gone");
        }
        if let Err(e) = handle.await {
            warn!(error = %e, "reporter task failed");
        }
    }

    /// Export every registered metric once, on the calling thread.
    pub fn report(&self) {
        self.engine.report();
    }

    /// Cumulative number of failed sends.
    pub fn errors_count(&self) -> u64 {
        self.engine.errors_count()
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.engine.registry
    }

    /// Register `metric` under `name` and `tags`.
    pub fn register_metric(
        &self,
        name: &str,
        metric: impl Into<Metric>,
        tags: &Tags,
    ) -> RegistryResult<()> {
        self.engine.registry.register_tagged(name, tags, metric.into())
    }

    pub fn get_metric(&self, name: &str, tags: &Tags) -> Option<Metric> {
        self.engine.registry.get_tagged(name, tags)
    }

    pub fn get_or_register_metric(
        &self,
        name: &str,
        tags: &Tags,
        factory: impl FnMut() -> Metric,
    ) -> RegistryResult<Metric> {
        self.engine
            .registry
            .get_or_register_tagged(name, tags, factory)
    }

    pub fn unregister_metric(&self, name: &str, tags: &Tags) {
        self.engine.registry.unregister_tagged(name, tags);
    }

    async fn command(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            debug!(?command, "reporter closed; command ignored");
        }
    }
}

fn validate(options: &ReporterOptions) -> ReporterResult<()> {
    if options.interval.is_zero() {
        return Err(ReporterError::InvalidOption {
            option: "interval",
            reason: "must be greater than zero",
        });
    }
    if Instant::now().checked_add(options.interval).is_none() {
        return Err(ReporterError::InvalidOption {
            option: "interval",
            reason: "too large to schedule",
        });
    }
    if options.duration_unit.is_zero() {
        return Err(ReporterError::InvalidOption {
            option: "duration_unit",
            reason: "must be greater than zero",
        });
    }
    if options.percentiles.iter().any(|&p| !(p > 0.0 && p <= 1.0)) {
        return Err(ReporterError::InvalidOption {
            option: "percentiles",
            reason: "each must be in (0, 1]",
        });
    }
    Ok(())
}

/// The background task: ticker plus command queue.
async fn run(
    engine: Arc<Engine>,
    mut commands: mpsc::Receiver<Command>,
    interval: Duration,
    mut running: bool,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Ticks are ignored until started.
                if !running {
                    debug!("reporter not running; tick ignored");
                } else if in_flight.as_ref().is_some_and(|pass| !pass.is_finished()) {
                    debug!("previous report pass still running; tick skipped");
                } else {
                    let engine = Arc::clone(&engine);
                    in_flight = Some(tokio::task::spawn_blocking(move || engine.report()));
                }
            }
            command = commands.recv() => match command {
                Some(Command::Start) => {
                    if !running {
                        info!("reporter started");
                    }
                    running = true;
                }
                Some(Command::Stop) => {
                    if running {
                        info!("reporter stopped");
                    }
                    running = false;
                }
                Some(Command::Close) | None => break,
            },
        }
    }

    if let Some(pass) = in_flight.take() {
        if let Err(e) = pass.await {
            warn!(error = %e, "scheduled report pass failed");
        }
    }

    let last = Arc::clone(&engine);
    let closed = tokio::task::spawn_blocking(move || {
        last.report();
        last.sender.close();
    })
    .await;
    match closed {
        Ok(()) => info!(errors = engine.errors_count(), "reporter closed"),
        Err(e) => warn!(error = %e, "final report failed"),
    }
}

/// State shared by the reporter handle, its task and every export pass.
struct Engine {
    sender: Arc<dyn MetricSender>,
    registry: Arc<dyn Registry>,
    names: NameFormatter,
    source: String,
    app_tags: Tags,
    percentiles: Vec<f64>,
    unit_nanos: i64,
    log_errors: bool,
    runtime: Option<RuntimeMetrics>,
    /// Serializes export passes.
    pass: Mutex<()>,
    errors: AtomicU64,
}

impl Engine {
    fn errors_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn report(&self) {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);
        let started = std::time::Instant::now();
        let before = self.errors_count();

        if let Some(runtime) = &self.runtime {
            runtime.refresh();
        }

        let mut exported = 0usize;
        self.registry.each(&mut |key, metric| {
            let (name, tags) = decode_key(key);
            let tags = merge_tags(&self.app_tags, tags);
            self.report_metric(&name, metric, &tags);
            exported += 1;
        });

        let failed = self.errors_count().saturating_sub(before);
        if failed > 0 && self.log_errors {
            warn!(failed, "report pass finished with send errors");
        }
        debug!(
            metrics = exported,
            failed,
            elapsed_us = started.elapsed().as_micros() as u64,
            "report pass complete"
        );
    }

    fn report_metric(&self, name: &str, metric: &Metric, tags: &Tags) {
        match metric {
            Metric::Counter(counter) if has_delta_prefix(name) => {
                self.report_delta(name, counter, tags);
            }
            Metric::Counter(counter) => {
                self.send(self.names.prepare(name, &["count"]), counter.count() as f64, tags);
            }
            Metric::Gauge(gauge) => {
                self.send(self.names.prepare(name, &["value"]), gauge.value() as f64, tags);
            }
            Metric::FloatGauge(gauge) => {
                self.send(self.names.prepare(name, &["value"]), gauge.value(), tags);
            }
            Metric::Windowed(histogram) => self.report_distributions(name, histogram, tags),
            Metric::Histogram(histogram) => {
                self.report_histogram(name, &histogram.snapshot(), tags);
            }
            Metric::Meter(meter) => self.report_meter(name, &meter.snapshot(), tags),
            Metric::Timer(timer) => self.report_timer(name, &timer.snapshot(), tags),
        }
    }

    /// Send the value accumulated since the last pass and subtract it.
    /// Increments racing with the pass stay in the counter.
    fn report_delta(&self, name: &str, counter: &Counter, tags: &Tags) {
        let value = counter.count();
        counter.dec(value);

        let name = format!(
            "{DELTA_PREFIX}{}",
            self.names.prepare(strip_delta_prefix(name), &["count"])
        );
        let result = self
            .sender
            .send_delta_counter(&name, value as f64, &self.source, tags);
        self.record(&name, result);
    }

    fn report_distributions(&self, name: &str, histogram: &WindowedHistogram, tags: &Tags) {
        let granularities = HashSet::from([histogram.granularity()]);
        let name = self.names.prepare(name, &[]);
        for distribution in histogram.distributions() {
            if distribution.centroids.is_empty() {
                continue;
            }
            let result = self.sender.send_distribution(
                &name,
                &distribution.centroids,
                &granularities,
                distribution.timestamp,
                &self.source,
                tags,
            );
            self.record(&name, result);
        }
    }

    fn report_histogram(&self, name: &str, h: &HistogramSnapshot, tags: &Tags) {
        self.send_stat(name, "count", h.count() as f64, tags);
        self.send_stat(name, "min", h.min() as f64, tags);
        self.send_stat(name, "max", h.max() as f64, tags);
        self.send_stat(name, "mean", h.mean(), tags);
        self.send_stat(name, "std-dev", h.std_dev(), tags);
        self.send_percentiles(name, h, 1.0, tags);
    }

    fn report_meter(&self, name: &str, m: &MeterSnapshot, tags: &Tags) {
        self.send_stat(name, "count", m.count as f64, tags);
        self.send_stat(name, "one-minute", m.rate1, tags);
        self.send_stat(name, "five-minute", m.rate5, tags);
        self.send_stat(name, "fifteen-minute", m.rate15, tags);
        self.send_stat(name, "mean", m.rate_mean, tags);
    }

    /// Durations are scaled to the configured unit; rates are not.
    fn report_timer(&self, name: &str, t: &TimerSnapshot, tags: &Tags) {
        let h = &t.histogram;
        let unit = self.unit_nanos as f64;
        self.send_stat(name, "count", h.count() as f64, tags);
        self.send_stat(name, "min", (h.min() / self.unit_nanos) as f64, tags);
        self.send_stat(name, "max", (h.max() / self.unit_nanos) as f64, tags);
        self.send_stat(name, "mean", h.mean() / unit, tags);
        self.send_stat(name, "std-dev", h.std_dev() / unit, tags);
        self.send_percentiles(name, h, unit, tags);
        self.send_stat(name, "one-minute", t.meter.rate1, tags);
        self.send_stat(name, "five-minute", t.meter.rate5, tags);
        self.send_stat(name, "fifteen-minute", t.meter.rate15, tags);
        self.send_stat(name, "mean-rate", t.meter.rate_mean, tags);
    }

    fn send_percentiles(&self, name: &str, h: &HistogramSnapshot, divisor: f64, tags: &Tags) {
        let values = h.percentiles(&self.percentiles);
        for (&p, value) in self.percentiles.iter().zip(values) {
            let stat = format!("{}-percentile", percentile_key(p));
            self.send_stat(name, &stat, value / divisor, tags);
        }
    }

    /// Multi-point stats always carry their stat segment, suffix mode or not.
    fn send_stat(&self, name: &str, stat: &str, value: f64, tags: &Tags) {
        self.send(self.names.prepare(&format!("{name}.{stat}"), &[]), value, tags);
    }

    fn send(&self, name: String, value: f64, tags: &Tags) {
        let result = self
            .sender
            .send_metric(&name, value, 0, &self.source, tags);
        self.record(&name, result);
    }

    fn record(&self, name: &str, result: SendResult<()>) {
        if let Err(e) = result {
            self.errors.fetch_add(1, Ordering::Relaxed);
            if self.log_errors {
                warn!(metric = %name, error = %e, "failed to send metric");
            }
        }
    }
}
