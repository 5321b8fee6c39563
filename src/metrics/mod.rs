//! Metrics for the court-queue engine
//!
//! Prometheus counters, gauges and histograms plus text exposition.

pub mod collector;

pub use collector::{MatchMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, QueueMetrics};
