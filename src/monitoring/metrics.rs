//! Service metrics
//!
//! Lock-free atomics for plain counters; one `RwLock` over the remaining
//! mutable state (latency window and gauges) so the hot path acquires at
//! most a single lock.

use crate::drift::{DriftType, MonitoringResult};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Inner mutable state protected by a single lock
struct MetricsInner {
    /// Rolling prediction latency window (milliseconds)
    latencies: VecDeque<f64>,
    /// Features analyzed by the most recent data drift pass
    features_analyzed: usize,
    /// Rolling accuracy from the most recent concept drift pass
    rolling_accuracy: Option<f64>,
}

/// Counters and gauges for the serving layer
pub struct ServiceMetrics {
    window_size: usize,
    inner: RwLock<MetricsInner>,

    predictions_total: AtomicU64,
    prediction_errors: AtomicU64,
    monitor_executions: AtomicU64,
    data_drift_alerts: AtomicU64,
    concept_drift_alerts: AtomicU64,

    start_time: Instant,
}

/// Serializable point-in-time view of the metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions_total: u64,
    pub prediction_errors: u64,
    pub monitor_executions: u64,
    pub data_drift_alerts: u64,
    pub concept_drift_alerts: u64,
    pub features_analyzed: usize,
    pub rolling_accuracy: Option<f64>,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

impl ServiceMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            inner: RwLock::new(MetricsInner {
                latencies: VecDeque::with_capacity(window_size),
                features_analyzed: 0,
                rolling_accuracy: None,
            }),
            predictions_total: AtomicU64::new(0),
            prediction_errors: AtomicU64::new(0),
            monitor_executions: AtomicU64::new(0),
            data_drift_alerts: AtomicU64::new(0),
            concept_drift_alerts: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one served prediction and its latency
    pub fn record_prediction(&self, latency_ms: f64) {
        self.predictions_total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inner) = self.inner.write() {
            inner.latencies.push_back(latency_ms);
            if inner.latencies.len() > self.window_size {
                inner.latencies.pop_front();
            }
        }
    }

    /// Record a failed prediction request
    pub fn record_prediction_error(&self) {
        self.prediction_errors.fetch_add(1, Ordering::SeqCst);
    }

    /// Update counters and gauges from one monitoring result
    pub fn record_monitoring(&self, result: &MonitoringResult) {
        if !result.monitoring_active {
            return;
        }
        self.monitor_executions.fetch_add(1, Ordering::SeqCst);

        for alert in &result.alerts {
            match alert.drift_type {
                DriftType::Data => self.data_drift_alerts.fetch_add(1, Ordering::SeqCst),
                DriftType::Concept => self.concept_drift_alerts.fetch_add(1, Ordering::SeqCst),
            };
        }

        if let Ok(mut inner) = self.inner.write() {
            if let Some(report) = &result.data_drift {
                inner.features_analyzed = report.features_analyzed;
            }
            if let Some(report) = &result.concept_drift {
                if let Some(&accuracy) = report.rolling_metrics.get("accuracy") {
                    inner.rolling_accuracy = Some(accuracy);
                }
            }
        }
    }

    /// Point-in-time view of all counters and gauges
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (features_analyzed, rolling_accuracy, avg_latency_ms, max_latency_ms) =
            match self.inner.read() {
                Ok(inner) => {
                    let avg = if inner.latencies.is_empty() {
                        0.0
                    } else {
                        inner.latencies.iter().sum::<f64>() / inner.latencies.len() as f64
                    };
                    let max = inner.latencies.iter().copied().fold(0.0, f64::max);
                    (inner.features_analyzed, inner.rolling_accuracy, avg, max)
                }
                Err(_) => (0, None, 0.0, 0.0),
            };

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions_total: self.predictions_total.load(Ordering::SeqCst),
            prediction_errors: self.prediction_errors.load(Ordering::SeqCst),
            monitor_executions: self.monitor_executions.load(Ordering::SeqCst),
            data_drift_alerts: self.data_drift_alerts.load(Ordering::SeqCst),
            concept_drift_alerts: self.concept_drift_alerts.load(Ordering::SeqCst),
            features_analyzed,
            rolling_accuracy,
            avg_latency_ms,
            max_latency_ms,
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new(1000)
    }
}
