//! Request metrics and statistics tracking for the prediction service.

use crate::error::ErrorKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all request handlers
pub struct ServiceMetrics {
    /// Prediction requests answered successfully
    pub requests_succeeded: AtomicU64,
    /// Prediction requests that failed for any reason
    pub requests_failed: AtomicU64,
    /// Total input rows predicted
    pub rows_predicted: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<ErrorKind, u64>>,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            rows_predicted: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction request
    pub fn record_success(&self, latency: Duration, rows: usize) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        self.rows_predicted.fetch_add(rows as u64, Ordering::Relaxed);
        self.record_latency(latency);
    }

    /// Record a failed prediction request
    pub fn record_failure(&self, latency: Duration, kind: ErrorKind) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
        self.record_latency(latency);
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = match self.latencies.read() {
            Ok(times) => times.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get failure counts by error kind
    pub fn failures_by_kind(&self) -> HashMap<ErrorKind, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Get current throughput (requests per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let total = self.requests_succeeded.load(Ordering::Relaxed)
            + self.requests_failed.load(Ordering::Relaxed);
        if elapsed > 0.0 {
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let succeeded = self.requests_succeeded.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let rows = self.rows_predicted.load(Ordering::Relaxed);
        let latency = self.latency_stats();
        let failures = self.failures_by_kind();

        info!(
            succeeded,
            failed,
            rows,
            throughput = format!("{:.1} req/s", self.throughput()),
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Service metrics summary"
        );
        for kind in ErrorKind::ALL {
            if let Some(count) = failures.get(&kind) {
                info!(kind = %kind, count, "Failures by kind");
            }
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_success(Duration::from_micros(100), 1);
        metrics.record_success(Duration::from_micros(300), 2);
        metrics.record_failure(Duration::from_micros(50), ErrorKind::ShapeMismatch);
        metrics.record_failure(Duration::from_micros(60), ErrorKind::ShapeMismatch);
        metrics.record_failure(Duration::from_micros(70), ErrorKind::InternalFailure);

        assert_eq!(metrics.requests_succeeded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_failed.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.rows_predicted.load(Ordering::Relaxed), 3);

        let failures = metrics.failures_by_kind();
        assert_eq!(failures.get(&ErrorKind::ShapeMismatch), Some(&2));
        assert_eq!(failures.get(&ErrorKind::InternalFailure), Some(&1));
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.latency_stats().count, 0);

        for us in 1..=100 {
            metrics.record_success(Duration::from_micros(us), 1);
        }
        let stats = metrics.latency_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.p50_us, 51);
        assert!(stats.p99_us >= stats.p95_us);
    }
}
