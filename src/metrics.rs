//! Request statistics for the inference service.

use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for served predictions
pub struct ServiceMetrics {
    /// Successful predictions
    pub predictions_served: AtomicU64,
    /// Failed predictions by error kind
    rejections: RwLock<HashMap<&'static str, u64>>,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Predictions per returned label
    labels: RwLock<HashMap<String, u64>>,
    /// Confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
    /// Wall-clock start, for the summary header
    started_at: DateTime<Utc>,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            rejections: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            labels: RwLock::new(HashMap::new()),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, label: &str, confidence: f64) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }

        if let Ok(mut labels) = self.labels.write() {
            *labels.entry(label.to_string()).or_insert(0) += 1;
        }

        let bucket = (confidence.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a prediction that ended in a classified error
    pub fn record_rejection(&self, error: &ServiceError) {
        if let Ok(mut rejections) = self.rejections.write() {
            *rejections.entry(error.kind()).or_insert(0) += 1;
        }
    }

    pub fn rejection_count(&self, error: &ServiceError) -> u64 {
        self.rejections
            .read()
            .ok()
            .and_then(|r| r.get(error.kind()).copied())
            .unwrap_or(0)
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        let times = match self.latencies.read() {
            Ok(times) => times.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times;
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Predictions per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_label_distribution(&self) -> HashMap<String, u64> {
        self.labels.read().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();
        let rejections = self.rejections.read().map(|r| r.clone()).unwrap_or_default();

        info!(
            since = %self.started_at.to_rfc3339(),
            served = served,
            throughput = format!("{:.2} req/s", self.get_throughput()),
            not_ready = rejections.get("not_ready").copied().unwrap_or(0),
            invalid_input = rejections.get("invalid_input").copied().unwrap_or(0),
            inference_failure = rejections.get("inference_failure").copied().unwrap_or(0),
            "Prediction summary"
        );

        if latency.count > 0 {
            info!(
                mean_us = latency.mean_us,
                p50_us = latency.p50_us,
                p95_us = latency.p95_us,
                p99_us = latency.p99_us,
                max_us = latency.max_us,
                "Prediction latency"
            );
        }

        for (label, count) in &self.get_label_distribution() {
            let pct = if served > 0 {
                (*count as f64 / served as f64) * 100.0
            } else {
                0.0
            };
            info!(label = %label, count = count, "  {:10} {:>6} ({:>5.1}%)", label, count, pct);
        }

        let dist = self.get_confidence_distribution();
        let total: u64 = dist.iter().sum();
        if total > 0 {
            for (i, &count) in dist.iter().enumerate().filter(|(_, c)| **c > 0) {
                let pct = (count as f64 / total as f64) * 100.0;
                info!(
                    "  confidence {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct,
                    "█".repeat(((pct / 5.0) as usize).min(20))
                );
            }
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prediction latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
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
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
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

        metrics.record_prediction(Duration::from_micros(100), "POSITIVE", 0.98);
        metrics.record_prediction(Duration::from_micros(300), "NEGATIVE", 0.61);
        metrics.record_prediction(Duration::from_micros(200), "POSITIVE", 1.0);
        metrics.record_rejection(&ServiceError::InvalidInput);

        assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.rejection_count(&ServiceError::InvalidInput), 1);
        assert_eq!(metrics.rejection_count(&ServiceError::NotReady), 0);

        let labels = metrics.get_label_distribution();
        assert_eq!(labels.get("POSITIVE"), Some(&2));

        let dist = metrics.get_confidence_distribution();
        assert_eq!(dist[9], 2);
        assert_eq!(dist[6], 1);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.get_latency_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_prediction(Duration::from_micros(us), "POSITIVE", 0.9);
        }

        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
