//! Metrics collection using Prometheus
//!
//! Counters and histograms for the waiting line, the match lifecycle and
//! per-operation latency. Every collector owns its registry so tests and
//! multiple services in one process never collide.

use crate::error::CourtQueueError;
use crate::types::MatchResult;
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Waiting-line metrics
    queue_metrics: QueueMetrics,

    /// Match lifecycle metrics
    match_metrics: MatchMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Waiting-line metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Total successful joins
    pub joins_total: IntCounter,

    /// Total successful leaves
    pub leaves_total: IntCounter,

    /// Total call-next operations
    pub calls_total: IntCounter,

    /// Total participants moved from waiting to called
    pub participants_called_total: IntCounter,

    /// Participants currently waiting, as of the last mutation
    pub waiting: IntGauge,
}

/// Match lifecycle metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Total matches created
    pub matches_created_total: IntCounter,

    /// Total matches resolved, by result
    pub matches_resolved_total: IntCounterVec,

    /// Total stats records updated from resolved matches
    pub stats_updates_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Engine operation durations
    pub operation_duration: HistogramVec,

    /// Failed operations, by operation and error kind
    pub operation_errors_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            queue_metrics,
            match_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a join and the resulting queue length
    pub fn record_join(&self, waiting: usize) {
        self.queue_metrics.joins_total.inc();
        self.queue_metrics.waiting.set(waiting as i64);
    }

    /// Record a leave and the resulting queue length
    pub fn record_leave(&self, waiting: usize) {
        self.queue_metrics.leaves_total.inc();
        self.queue_metrics.waiting.set(waiting as i64);
    }

    /// Record a call-next and the resulting queue length
    pub fn record_call(&self, called: usize, waiting: usize) {
        self.queue_metrics.calls_total.inc();
        self.queue_metrics
            .participants_called_total
            .inc_by(called as u64);
        self.queue_metrics.waiting.set(waiting as i64);
    }

    /// Record a match being created
    pub fn record_match_created(&self) {
        self.match_metrics.matches_created_total.inc();
    }

    /// Record a match being resolved along with the number of stats records touched
    pub fn record_match_resolved(&self, result: MatchResult, stats_updated: usize) {
        self.match_metrics
            .matches_resolved_total
            .with_label_values(&[result.as_str()])
            .inc();
        self.match_metrics
            .stats_updates_total
            .inc_by(stats_updated as u64);
    }

    /// Record the duration of an engine operation
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Record a failed engine operation
    pub fn record_error(&self, operation: &str, error: &CourtQueueError) {
        self.performance_metrics
            .operation_errors_total
            .with_label_values(&[operation, error.kind()])
            .inc();
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let joins_total = IntCounter::new("court_queue_joins_total", "Total queue joins")?;
        registry.register(Box::new(joins_total.clone()))?;

        let leaves_total = IntCounter::new("court_queue_leaves_total", "Total queue leaves")?;
        registry.register(Box::new(leaves_total.clone()))?;

        let calls_total =
            IntCounter::new("court_queue_calls_total", "Total call-next operations")?;
        registry.register(Box::new(calls_total.clone()))?;

        let participants_called_total = IntCounter::new(
            "court_queue_participants_called_total",
            "Total participants called from the queue",
        )?;
        registry.register(Box::new(participants_called_total.clone()))?;

        let waiting = IntGauge::new("court_queue_waiting", "Participants currently waiting")?;
        registry.register(Box::new(waiting.clone()))?;

        Ok(Self {
            joins_total,
            leaves_total,
            calls_total,
            participants_called_total,
            waiting,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_created_total =
            IntCounter::new("court_queue_matches_created_total", "Total matches created")?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let matches_resolved_total = IntCounterVec::new(
            Opts::new(
                "court_queue_matches_resolved_total",
                "Total matches resolved",
            ),
            &["result"],
        )?;
        registry.register(Box::new(matches_resolved_total.clone()))?;

        let stats_updates_total = IntCounter::new(
            "court_queue_stats_updates_total",
            "Total participant stats updates",
        )?;
        registry.register(Box::new(stats_updates_total.clone()))?;

        Ok(Self {
            matches_created_total,
            matches_resolved_total,
            stats_updates_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "court_queue_operation_duration_seconds",
                "Engine operation duration",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let operation_errors_total = IntCounterVec::new(
            Opts::new(
                "court_queue_operation_errors_total",
                "Failed engine operations",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operation_errors_total.clone()))?;

        Ok(Self {
            operation_duration,
            operation_errors_total,
        })
    }
}
