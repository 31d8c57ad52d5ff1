//! End-to-end reporter behavior against a recording sender.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pulse_core::{ApplicationTags, Tags, tags};
use pulse_histogram::{Centroid, Granularity, HistogramOptions, ManualClock, TimedHistogram};
use pulse_metrics::{
    Counter, FloatGauge, Gauge, Histogram, Meter, Metric, Registry, StandardRegistry, Timer,
    WindowedHistogram,
};
use pulse_registry::TaggedRegistry;
use pulse_reporter::{
    MetricSender, Reporter, ReporterOptions, SendError, SendResult, delta_counter_name,
};

#[derive(Debug, Clone, PartialEq)]
struct Point {
    name: String,
    value: f64,
    source: String,
    tags: Tags,
}

#[derive(Debug, Clone)]
struct DistributionPoint {
    name: String,
    centroids: Vec<Centroid>,
    granularities: HashSet<Granularity>,
    timestamp: i64,
}

/// Records every call; rejects points whose name has an empty base.
#[derive(Default)]
struct RecordingSender {
    metrics: Mutex<Vec<Point>>,
    deltas: Mutex<Vec<Point>>,
    distributions: Mutex<Vec<DistributionPoint>>,
    closed: AtomicUsize,
}

impl RecordingSender {
    fn metrics(&self) -> Vec<Point> {
        self.metrics.lock().unwrap().clone()
    }

    fn deltas(&self) -> Vec<Point> {
        self.deltas.lock().unwrap().clone()
    }

    fn distributions(&self) -> Vec<DistributionPoint> {
        self.distributions.lock().unwrap().clone()
    }

    fn metric(&self, name: &str) -> Option<Point> {
        self.metrics().into_iter().find(|p| p.name == name)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MetricSender for RecordingSender {
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        _timestamp: i64,
        source: &str,
        tags: &Tags,
    ) -> SendResult<()> {
        if name.starts_with('.') {
            return Err(SendError::Invalid {
                name: name.to_string(),
                reason: "empty metric name".to_string(),
            });
        }
        self.metrics.lock().unwrap().push(Point {
            name: name.to_string(),
            value,
            source: source.to_string(),
            tags: tags.clone(),
        });
        Ok(())
    }

    fn send_delta_counter(
        &self,
        name: &str,
        value: f64,
        source: &str,
        tags: &Tags,
    ) -> SendResult<()> {
        self.deltas.lock().unwrap().push(Point {
            name: name.to_string(),
            value,
            source: source.to_string(),
            tags: tags.clone(),
        });
        Ok(())
    }

    fn send_distribution(
        &self,
        name: &str,
        centroids: &[Centroid],
        granularities: &HashSet<Granularity>,
        timestamp: i64,
        _source: &str,
        _tags: &Tags,
    ) -> SendResult<()> {
        self.distributions.lock().unwrap().push(DistributionPoint {
            name: name.to_string(),
            centroids: centroids.to_vec(),
            granularities: granularities.clone(),
            timestamp,
        });
        Ok(())
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manual_options() -> ReporterOptions {
    ReporterOptions::default()
        .with_source("test-host")
        .with_auto_start(false)
        .with_log_errors(true)
}

fn reporter_with(options: ReporterOptions) -> (Reporter, Arc<RecordingSender>) {
    init_tracing();
    let sender = Arc::new(RecordingSender::default());
    let registry: Arc<dyn Registry> = Arc::new(TaggedRegistry::new());
    let reporter = Reporter::new(sender.clone(), registry, options).unwrap();
    (reporter, sender)
}

fn names(points: &[Point]) -> Vec<&str> {
    points.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn application_tags_merge_under_metric_tags() {
    let (reporter, sender) =
        reporter_with(manual_options().with_application(ApplicationTags::new("app", "srv")));

    reporter
        .get_or_register_metric("m1", &tags([("tag1", "tag")]), || Counter::new().into())
        .unwrap();
    reporter
        .get_or_register_metric("m2", &tags([("application", "tag")]), || {
            Counter::new().into()
        })
        .unwrap();

    reporter.report();
    reporter.close().await;

    let m1 = sender.metric("m1.count").unwrap();
    assert_eq!(m1.tags.len(), 5);
    assert_eq!(m1.tags["application"], "app");
    assert_eq!(m1.tags["cluster"], "none");
    assert_eq!(m1.source, "test-host");

    let m2 = sender.metric("m2.count").unwrap();
    assert_eq!(m2.tags.len(), 4);
    assert_eq!(m2.tags["application"], "tag");
}

#[tokio::test]
async fn send_failures_are_counted_and_do_not_abort_the_pass() {
    let (reporter, sender) = reporter_with(manual_options());
    let tags = tags([("tag1", "tag")]);

    reporter
        .get_or_register_metric("", &tags, || Counter::new().into())
        .unwrap();
    let counter = Counter::new();
    reporter.register_metric("m1", counter.clone(), &tags).unwrap();
    counter.inc(1);

    reporter.report();

    assert_eq!(names(&sender.metrics()), ["m1.count"]);
    assert_eq!(reporter.errors_count(), 1);

    reporter.report();
    assert_eq!(reporter.errors_count(), 2);
    reporter.close().await;
}

#[tokio::test]
async fn counter_reports_cumulative_count() {
    let (reporter, sender) = reporter_with(manual_options());
    let tags = tags([("tag1", "tag")]);

    if reporter.get_metric("counter", &tags).is_none() {
        reporter
            .register_metric("counter", Counter::new(), &tags)
            .unwrap();
    }
    let counter = reporter.get_metric("counter", &tags).unwrap();
    counter.as_counter().unwrap().inc(1);

    for _ in 0..3 {
        reporter.report();
    }

    let points = sender.metrics();
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|p| p.name == "counter.count" && p.value == 1.0));
    reporter.close().await;
}

#[tokio::test]
async fn duplicate_registration_keeps_original() {
    let (reporter, _sender) = reporter_with(manual_options());
    let original = Counter::new();
    original.inc(7);
    reporter
        .register_metric("dup", original.clone(), &Tags::new())
        .unwrap();

    assert!(reporter
        .register_metric("dup", Counter::new(), &Tags::new())
        .is_err());
    let found = reporter.get_metric("dup", &Tags::new()).unwrap();
    assert!(found.as_counter().unwrap().ptr_eq(&original));
    reporter.close().await;
}

#[tokio::test]
async fn delta_counter_sends_increments_and_resets() {
    let (reporter, sender) = reporter_with(manual_options());
    let counter = Counter::new();
    reporter
        .register_metric(&delta_counter_name("jobs"), counter.clone(), &Tags::new())
        .unwrap();
    counter.inc(10);

    reporter.report();
    let deltas = sender.deltas();
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].name, "\u{2206}jobs.count");
    assert_eq!(deltas[0].value, 10.0);
    assert_eq!(counter.count(), 0);

    // Zero deltas are still sent.
    reporter.report();
    let deltas = sender.deltas();
    assert_eq!(deltas.len(), 2);
    assert_eq!(deltas[1].value, 0.0);

    counter.inc(3);
    reporter.report();
    assert_eq!(sender.deltas()[2].value, 3.0);

    assert!(sender.metrics().is_empty());
    reporter.close().await;
}

#[tokio::test]
async fn delta_increments_racing_with_reports_are_not_lost() {
    let (reporter, sender) = reporter_with(manual_options());
    let counter = Counter::new();
    reporter
        .register_metric(&delta_counter_name("racy"), counter.clone(), &Tags::new())
        .unwrap();

    const PRODUCERS: i64 = 4;
    const INCREMENTS: i64 = 20_000;
    let producing = AtomicBool::new(true);

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let counter = counter.clone();
                scope.spawn(move || {
                    for _ in 0..INCREMENTS {
                        counter.inc(1);
                    }
                })
            })
            .collect();
        scope.spawn(|| {
            while producing.load(Ordering::SeqCst) {
                reporter.report();
            }
        });
        for worker in workers {
            worker.join().unwrap();
        }
        producing.store(false, Ordering::SeqCst);
    });

    let exported: f64 = sender.deltas().iter().map(|p| p.value).sum();
    assert_eq!(exported as i64 + counter.count(), PRODUCERS * INCREMENTS);
    reporter.close().await;
}

#[tokio::test]
async fn alternate_delta_marker_exports_canonical_name() {
    let (reporter, sender) = reporter_with(manual_options().with_prefix("svc"));
    let counter = Counter::new();
    reporter
        .register_metric("\u{0394}jobs", counter.clone(), &Tags::new())
        .unwrap();
    counter.inc(2);

    reporter.report();
    let deltas = sender.deltas();
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].name, "\u{2206}svc.jobs.count");
    assert_eq!(deltas[0].value, 2.0);
    reporter.close().await;
}

#[tokio::test]
async fn gauges_report_value() {
    let (reporter, sender) = reporter_with(manual_options());
    let gauge = Gauge::new();
    gauge.update(42);
    let float = FloatGauge::new();
    float.update(0.25);
    reporter.register_metric("g", gauge, &Tags::new()).unwrap();
    reporter.register_metric("f", float, &Tags::new()).unwrap();

    reporter.report();
    assert_eq!(sender.metric("g.value").unwrap().value, 42.0);
    assert_eq!(sender.metric("f.value").unwrap().value, 0.25);
    reporter.close().await;
}

#[tokio::test]
async fn sampling_histogram_points() {
    let (reporter, sender) = reporter_with(manual_options());
    let histogram = Histogram::new();
    for v in [0, 1, 10, 10, 100, 1000, 10000, 10000, 100000] {
        histogram.update(v);
    }
    reporter
        .register_metric("mt.histogram", histogram, &tags([("tag1", "tag")]))
        .unwrap();

    reporter.report();
    let points = sender.metrics();
    assert_eq!(
        names(&points),
        [
            "mt.histogram.count",
            "mt.histogram.min",
            "mt.histogram.max",
            "mt.histogram.mean",
            "mt.histogram.std-dev",
            "mt.histogram.50-percentile",
            "mt.histogram.75-percentile",
            "mt.histogram.95-percentile",
            "mt.histogram.99-percentile",
            "mt.histogram.999-percentile",
        ]
    );
    assert_eq!(sender.metric("mt.histogram.count").unwrap().value, 9.0);
    assert_eq!(sender.metric("mt.histogram.max").unwrap().value, 100000.0);
    let mean = sender.metric("mt.histogram.mean").unwrap().value;
    assert!((mean - 13457.89).abs() < 0.01);
    assert!(sender.distributions().is_empty());
    reporter.close().await;
}

#[tokio::test]
async fn empty_sampling_histogram_has_nan_mean() {
    let (reporter, sender) = reporter_with(manual_options());
    reporter
        .register_metric("empty", Histogram::new(), &Tags::new())
        .unwrap();

    reporter.report();
    assert_eq!(sender.metric("empty.count").unwrap().value, 0.0);
    assert!(sender.metric("empty.mean").unwrap().value.is_nan());
    reporter.close().await;
}

#[tokio::test]
async fn extreme_histogram_and_timer_values_still_report() {
    let (reporter, sender) = reporter_with(manual_options());
    let histogram = Histogram::new();
    histogram.update(i64::MAX);
    histogram.update(1);
    reporter.register_metric("big", histogram, &Tags::new()).unwrap();

    let timer = Timer::new();
    timer.update(Duration::MAX);
    timer.update(Duration::from_secs(1));
    reporter.register_metric("slow", timer, &Tags::new()).unwrap();
    reporter
        .register_metric("after", Counter::new(), &Tags::new())
        .unwrap();

    reporter.report();
    assert_eq!(sender.metric("big.max").unwrap().value, i64::MAX as f64);
    assert!(sender.metric("big.mean").unwrap().value.is_finite());
    assert_eq!(sender.metric("slow.count").unwrap().value, 2.0);
    assert!(sender.metric("slow.std-dev").unwrap().value.is_finite());
    assert!(sender.metric("after.count").is_some());
    assert_eq!(reporter.errors_count(), 0);
    reporter.close().await;
}

#[tokio::test]
async fn windowed_histogram_sends_one_distribution_per_window() {
    let (reporter, sender) = reporter_with(manual_options());
    let clock = Arc::new(ManualClock::new(1_700_000_040_000));
    let histogram = WindowedHistogram::from_streaming(Arc::new(TimedHistogram::with_clock(
        HistogramOptions::default(),
        clock.clone(),
    )));
    reporter
        .register_metric("wf.histogram", histogram.clone(), &tags([("tag1", "tag")]))
        .unwrap();

    for i in 0..1000 {
        histogram.update(i * 7);
    }

    // Current window has not rotated yet.
    reporter.report();
    assert!(sender.distributions().is_empty());

    clock.advance(Duration::from_secs(60));
    reporter.report();
    reporter.report();

    let distributions = sender.distributions();
    assert_eq!(distributions.len(), 1);
    assert!(sender.metrics().is_empty());

    let d = &distributions[0];
    assert_eq!(d.name, "wf.histogram");
    assert!(!d.centroids.is_empty());
    assert_eq!(d.centroids.iter().map(|c| c.count).sum::<u64>(), 1000);
    assert_eq!(d.granularities, HashSet::from([Granularity::Minute]));
    assert_eq!(d.timestamp, 1_700_000_040);
    reporter.close().await;
}

#[tokio::test]
async fn meter_points() {
    let (reporter, sender) = reporter_with(manual_options());
    let meter = Meter::new();
    meter.mark(4);
    reporter.register_metric("m", meter, &Tags::new()).unwrap();

    reporter.report();
    assert_eq!(
        names(&sender.metrics()),
        [
            "m.count",
            "m.one-minute",
            "m.five-minute",
            "m.fifteen-minute",
            "m.mean"
        ]
    );
    assert_eq!(sender.metric("m.count").unwrap().value, 4.0);
    reporter.close().await;
}

#[tokio::test]
async fn timer_points_use_duration_unit() {
    let (reporter, sender) =
        reporter_with(manual_options().with_duration_unit(Duration::from_millis(1)));
    let timer = Timer::new();
    timer.update(Duration::from_millis(2));
    timer.update(Duration::from_millis(4));
    reporter.register_metric("t", timer, &Tags::new()).unwrap();

    reporter.report();
    let points = sender.metrics();
    assert_eq!(points.len(), 14);
    assert_eq!(points[0].name, "t.count");
    assert_eq!(points[13].name, "t.mean-rate");
    assert_eq!(sender.metric("t.count").unwrap().value, 2.0);
    assert_eq!(sender.metric("t.min").unwrap().value, 2.0);
    assert_eq!(sender.metric("t.max").unwrap().value, 4.0);
    assert_eq!(sender.metric("t.mean").unwrap().value, 3.0);
    assert_eq!(sender.metric("t.std-dev").unwrap().value, 1.0);
    assert!(sender.metric("t.999-percentile").is_some());
    reporter.close().await;
}

#[tokio::test]
async fn prefix_and_suffix_modes() {
    let (reporter, sender) =
        reporter_with(manual_options().with_prefix("svc.").with_add_suffix(false));
    reporter.register_metric("hits", Counter::new(), &Tags::new()).unwrap();
    reporter.register_metric("h", Histogram::new(), &Tags::new()).unwrap();

    reporter.report();
    assert!(sender.metric("svc.hits").is_some());
    assert!(sender.metric("svc.h.count").is_some());
    assert!(sender.metric("svc.h.50-percentile").is_some());
    reporter.close().await;
}

#[tokio::test]
async fn close_runs_one_final_report_then_closes_sender() {
    let (reporter, sender) = reporter_with(
        manual_options()
            .with_auto_start(true)
            .with_interval(Duration::from_secs(3600)),
    );
    reporter.register_metric("c", Counter::new(), &Tags::new()).unwrap();

    reporter.close().await;
    assert_eq!(names(&sender.metrics()), ["c.count"]);
    assert_eq!(sender.closed(), 1);

    reporter.close().await;
    reporter.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sender.metrics().len(), 1);
    assert_eq!(sender.closed(), 1);
}

#[tokio::test]
async fn dropping_the_reporter_closes_it() {
    let (reporter, sender) = reporter_with(manual_options());
    reporter.register_metric("c", Counter::new(), &Tags::new()).unwrap();
    drop(reporter);

    for _ in 0..100 {
        if sender.closed() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(sender.closed(), 1);
    assert_eq!(names(&sender.metrics()), ["c.count"]);
}

#[tokio::test]
async fn ticker_exports_only_while_running() {
    let (reporter, sender) =
        reporter_with(manual_options().with_interval(Duration::from_millis(20)));
    reporter.register_metric("c", Counter::new(), &Tags::new()).unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(sender.metrics().is_empty(), "ticks before start must be ignored");

    reporter.start().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sender.metrics().len() >= 2);

    reporter.stop().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_stop = sender.metrics().len();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(sender.metrics().len(), after_stop);

    reporter.close().await;
    assert_eq!(sender.metrics().len(), after_stop + 1);
}

#[tokio::test]
async fn concurrent_reports_neither_duplicate_nor_lose_points() {
    let (reporter, sender) = reporter_with(manual_options());
    for i in 0..10 {
        reporter
            .register_metric(&format!("c{i}"), Counter::new(), &Tags::new())
            .unwrap();
    }

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..5 {
                    reporter.report();
                }
            });
        }
    });

    let points = sender.metrics();
    assert_eq!(points.len(), 4 * 5 * 10);
    // Each pass emits its ten points contiguously.
    for pass in points.chunks(10) {
        let mut seen: Vec<&str> = names(pass);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 10);
    }
    reporter.close().await;
}

#[tokio::test]
async fn runtime_metrics_are_exported() {
    let (reporter, sender) = reporter_with(manual_options().with_runtime_metrics(true));
    reporter.report();

    let resident = sender.metric("runtime.memory.resident.value").unwrap();
    assert!(resident.value > 0.0);
    assert!(sender.metric("runtime.cpu.usage.value").is_some());
    assert!(sender.metric("runtime.uptime.value").is_some());
    reporter.close().await;
}

#[tokio::test]
async fn wraps_an_existing_plain_registry() {
    init_tracing();
    let plain: Arc<dyn Registry> = Arc::new(StandardRegistry::new());
    let legacy = Counter::new();
    legacy.inc(5);
    plain.register("legacy", legacy.into()).unwrap();

    let registry: Arc<dyn Registry> = Arc::new(TaggedRegistry::wrap(plain));
    let sender = Arc::new(RecordingSender::default());
    let reporter = Reporter::new(sender.clone(), registry, manual_options()).unwrap();
    reporter
        .register_metric("h", WindowedHistogram::new(), &Tags::new())
        .unwrap();

    reporter.report();
    assert_eq!(sender.metric("legacy.count").unwrap().value, 5.0);
    assert!(matches!(
        reporter.get_metric("h", &Tags::new()),
        Some(Metric::Windowed(_))
    ));
    reporter.close().await;
}
