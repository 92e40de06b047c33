//! Concept drift detection
//!
//! Tracks model performance over a rolling window of prediction outcomes and
//! flags sustained degradation relative to the validation baseline.

use crate::drift::{DriftAlert, DriftType, Severity, DEGRADATION_HIGH};
use crate::error::{Result, TalentMatchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// Performance metrics for one batch of labeled predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub sample_size: usize,
}

/// One metric whose rolling value fell past the degradation threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedMetric {
    pub metric: String,
    pub baseline: f64,
    pub current: f64,
    pub degradation: f64,
}

/// Degradation check outcome for one `update_performance` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptDriftResult {
    pub concept_drift_detected: bool,
    pub degraded_metrics: Vec<DegradedMetric>,
    pub alerts: Vec<DriftAlert>,
}

/// Result of one `update_performance` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Metrics of the batch just supplied
    pub current_metrics: PerformanceSnapshot,
    /// Rolling mean and std per metric (`accuracy`, `accuracy_std`, ...)
    pub rolling_metrics: BTreeMap<String, f64>,
    /// Drift status against the baseline
    pub drift_results: ConceptDriftResult,
    /// Entries currently held in the rolling history
    pub performance_history_size: usize,
}

/// Detects model performance degradation against a validation baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptDriftDetector {
    baseline_performance: BTreeMap<String, f64>,
    degradation_threshold: f64,
    window_size: usize,
    performance_history: VecDeque<PerformanceSnapshot>,
    alerts: Vec<DriftAlert>,
}

impl ConceptDriftDetector {
    /// Create a new detector.
    ///
    /// `baseline_performance` maps metric names to their expected values and
    /// must be non-empty; `window_size` must be at least 1.
    pub fn new(
        baseline_performance: BTreeMap<String, f64>,
        degradation_threshold: f64,
        window_size: usize,
    ) -> Result<Self> {
        if baseline_performance.is_empty() {
            return Err(TalentMatchError::InvalidParameter {
                name: "baseline_performance".to_string(),
                value: "{}".to_string(),
                reason: "must contain at least one metric".to_string(),
            });
        }
        if degradation_threshold <= 0.0 {
            return Err(TalentMatchError::InvalidParameter {
                name: "degradation_threshold".to_string(),
                value: degradation_threshold.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if window_size == 0 {
            return Err(TalentMatchError::InvalidParameter {
                name: "window_size".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            baseline_performance,
            degradation_threshold,
            window_size,
            performance_history: VecDeque::with_capacity(window_size),
            alerts: Vec::new(),
        })
    }

    /// Record one batch of labeled predictions and check for degradation.
    ///
    /// `y_true` and `y_pred` must be non-empty and equal length; a mismatch
    /// is a usage error surfaced to the caller. `y_pred_proba` is accepted
    /// for callers that have scores but takes no part in the rolling
    /// accuracy/precision/recall metrics.
    pub fn update_performance(
        &mut self,
        y_true: &[i64],
        y_pred: &[i64],
        _y_pred_proba: Option<&[f64]>,
    ) -> Result<PerformanceReport> {
        if y_true.is_empty() {
            return Err(TalentMatchError::ValidationError(
                "y_true and y_pred must be non-empty".to_string(),
            ));
        }
        if y_true.len() != y_pred.len() {
            return Err(TalentMatchError::ValidationError(format!(
                "y_true and y_pred length mismatch: {} vs {}",
                y_true.len(),
                y_pred.len()
            )));
        }

        let current_metrics = PerformanceSnapshot {
            timestamp: Utc::now(),
            accuracy: accuracy(y_true, y_pred),
            precision: weighted_precision(y_true, y_pred),
            recall: weighted_recall(y_true, y_pred),
            sample_size: y_true.len(),
        };

        self.performance_history.push_back(current_metrics.clone());
        while self.performance_history.len() > self.window_size {
            self.performance_history.pop_front();
        }

        let rolling_metrics = self.rolling_performance();
        let drift_results = self.detect_degradation(&rolling_metrics);

        Ok(PerformanceReport {
            current_metrics,
            rolling_metrics,
            drift_results,
            performance_history_size: self.performance_history.len(),
        })
    }

    /// Rolling mean and population std per metric over the current history
    fn rolling_performance(&self) -> BTreeMap<String, f64> {
        let mut rolling = BTreeMap::new();
        if self.performance_history.is_empty() {
            return rolling;
        }

        let extractors: [(&str, fn(&PerformanceSnapshot) -> f64); 3] = [
            ("accuracy", |s| s.accuracy),
            ("precision", |s| s.precision),
            ("recall", |s| s.recall),
        ];

        let n = self.performance_history.len() as f64;
        for (name, extract) in extractors {
            let mean = self.performance_history.iter().map(extract).sum::<f64>() / n;
            let variance = self
                .performance_history
                .iter()
                .map(|s| (extract(s) - mean).powi(2))
                .sum::<f64>()
                / n;
            rolling.insert(name.to_string(), mean);
            rolling.insert(format!("{name}_std"), variance.sqrt());
        }

        rolling
    }

    /// Compare rolling metrics against the baseline and raise alerts for
    /// every metric degraded beyond the threshold
    fn detect_degradation(&mut self, rolling: &BTreeMap<String, f64>) -> ConceptDriftResult {
        let mut result = ConceptDriftResult {
            concept_drift_detected: false,
            degraded_metrics: Vec::new(),
            alerts: Vec::new(),
        };

        for (metric, &baseline_value) in &self.baseline_performance {
            let Some(&current_value) = rolling.get(metric) else {
                continue;
            };

            let degradation = (baseline_value - current_value) / baseline_value;
            if degradation <= self.degradation_threshold {
                continue;
            }

            result.concept_drift_detected = true;
            result.degraded_metrics.push(DegradedMetric {
                metric: metric.clone(),
                baseline: baseline_value,
                current: current_value,
                degradation,
            });

            let severity = if degradation > DEGRADATION_HIGH {
                Severity::High
            } else {
                Severity::Medium
            };

            let alert = DriftAlert {
                timestamp: Utc::now(),
                drift_type: DriftType::Concept,
                severity,
                metric: metric.clone(),
                value: current_value,
                threshold: baseline_value * (1.0 - self.degradation_threshold),
                message: format!(
                    "Concept drift detected: {metric} degraded by {:.1}% \
                     (from {baseline_value:.3} to {current_value:.3})",
                    degradation * 100.0
                ),
            };

            warn!(
                metric = %metric,
                degradation = degradation,
                "concept drift detected"
            );

            self.alerts.push(alert.clone());
            result.alerts.push(alert);
        }

        result
    }

    /// All alerts this detector has ever raised, in creation order
    pub fn alerts(&self) -> &[DriftAlert] {
        &self.alerts
    }

    /// Entries currently held in the rolling history
    pub fn history_len(&self) -> usize {
        self.performance_history.len()
    }

    /// Oldest snapshot still inside the rolling window
    pub fn oldest_snapshot(&self) -> Option<&PerformanceSnapshot> {
        self.performance_history.front()
    }
}

fn accuracy(y_true: &[i64], y_pred: &[i64]) -> f64 {
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Per-class precision averaged with class support weights; classes whose
/// denominator is zero contribute 0 (sklearn's `zero_division=0`).
fn weighted_precision(y_true: &[i64], y_pred: &[i64]) -> f64 {
    weighted_class_metric(y_true, y_pred, |tp, fp, _fn_| {
        if tp + fp == 0 {
            0.0
        } else {
            tp as f64 / (tp + fp) as f64
        }
    })
}

/// Per-class recall averaged with class support weights
fn weighted_recall(y_true: &[i64], y_pred: &[i64]) -> f64 {
    weighted_class_metric(y_true, y_pred, |tp, _fp, fn_| {
        if tp + fn_ == 0 {
            0.0
        } else {
            tp as f64 / (tp + fn_) as f64
        }
    })
}

fn weighted_class_metric(
    y_true: &[i64],
    y_pred: &[i64],
    per_class: impl Fn(usize, usize, usize) -> f64,
) -> f64 {
    let mut classes: Vec<i64> = y_true.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let total = y_true.len() as f64;
    let mut weighted_sum = 0.0;

    for class in classes {
        let support = y_true.iter().filter(|&&t| t == class).count();
        let tp = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(&t, &p)| t == class && p == class)
            .count();
        let fp = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(&t, &p)| t != class && p == class)
            .count();
        let fn_ = support - tp;

        weighted_sum += per_class(tp, fp, fn_) * support as f64 / total;
    }

    weighted_sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> BTreeMap<String, f64> {
        BTreeMap::from([("accuracy".to_string(), 0.85)])
    }

    fn detector(window_size: usize) -> ConceptDriftDetector {
        ConceptDriftDetector::new(baseline(), 0.1, window_size).unwrap()
    }

    #[test]
    fn test_constructor_rejects_empty_baseline() {
        assert!(ConceptDriftDetector::new(BTreeMap::new(), 0.1, 100).is_err());
        assert!(ConceptDriftDetector::new(baseline(), 0.1, 0).is_err());
    }

    #[test]
    fn test_mismatched_labels_is_usage_error() {
        let mut det = detector(100);
        assert!(det.update_performance(&[1, 0], &[1], None).is_err());
        assert!(det.update_performance(&[], &[], None).is_err());
    }

    #[test]
    fn test_all_correct_gives_accuracy_one() {
        let mut det = detector(100);
        let report = det.update_performance(&[1, 0, 1, 1], &[1, 0, 1, 1], None).unwrap();
        assert_eq!(report.current_metrics.accuracy, 1.0);
        assert_eq!(report.current_metrics.precision, 1.0);
        assert_eq!(report.current_metrics.recall, 1.0);
    }

    #[test]
    fn test_all_wrong_gives_accuracy_zero() {
        let mut det = detector(100);
        let report = det.update_performance(&[1, 0, 1, 0], &[0, 1, 0, 1], None).unwrap();
        assert_eq!(report.current_metrics.accuracy, 0.0);
        assert_eq!(report.current_metrics.precision, 0.0);
        assert_eq!(report.current_metrics.recall, 0.0);
    }

    #[test]
    fn test_weighted_metrics_with_degenerate_class() {
        let mut det = detector(100);
        // Class 1 never predicted: precision for it is 0 by zero-division
        // rule, not an error.
        let report = det.update_performance(&[1, 1, 0, 0], &[0, 0, 0, 0], None).unwrap();
        assert_eq!(report.current_metrics.accuracy, 0.5);
        assert!(report.current_metrics.precision < 1.0);
    }

    #[test]
    fn test_fifo_eviction_at_window_size() {
        let mut det = detector(3);
        for i in 0..3i64 {
            det.update_performance(&[i % 2], &[i % 2], None).unwrap();
        }
        let oldest = det.oldest_snapshot().unwrap().timestamp;
        assert_eq!(det.history_len(), 3);

        det.update_performance(&[1], &[1], None).unwrap();
        assert_eq!(det.history_len(), 3);
        assert!(det.oldest_snapshot().unwrap().timestamp >= oldest);
    }

    #[test]
    fn test_degradation_medium_severity() {
        // Rolling accuracy 0.70 against baseline 0.85: degradation ~17.6%,
        // beyond the 10% threshold but below the high cutoff.
        let mut det = detector(10);
        let y_true = [1i64; 10];
        let mut y_pred = [1i64; 10];
        for slot in y_pred.iter_mut().take(3) {
            *slot = 0;
        }
        let report = det.update_performance(&y_true, &y_pred, None).unwrap();

        assert!(report.drift_results.concept_drift_detected);
        assert_eq!(report.drift_results.degraded_metrics.len(), 1);
        assert_eq!(report.drift_results.degraded_metrics[0].metric, "accuracy");
        assert_eq!(report.drift_results.alerts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_degradation_high_severity() {
        // Rolling accuracy 0.60: degradation ~29.4%, past the high cutoff.
        let mut det = detector(10);
        let y_true = [1i64; 10];
        let mut y_pred = [1i64; 10];
        for slot in y_pred.iter_mut().take(4) {
            *slot = 0;
        }
        let report = det.update_performance(&y_true, &y_pred, None).unwrap();

        assert!(report.drift_results.concept_drift_detected);
        assert_eq!(report.drift_results.alerts[0].severity, Severity::High);
        let threshold = report.drift_results.alerts[0].threshold;
        assert!((threshold - 0.85 * 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_no_drift_when_performance_holds() {
        let mut det = detector(10);
        let report = det.update_performance(&[1, 0, 1, 0], &[1, 0, 1, 0], None).unwrap();
        assert!(!report.drift_results.concept_drift_detected);
        assert!(det.alerts().is_empty());
    }

    #[test]
    fn test_rolling_metrics_include_std() {
        let mut det = detector(10);
        det.update_performance(&[1, 1], &[1, 1], None).unwrap();
        let report = det.update_performance(&[1, 1], &[0, 0], None).unwrap();

        let rolling = &report.rolling_metrics;
        assert!((rolling["accuracy"] - 0.5).abs() < 1e-12);
        assert!((rolling["accuracy_std"] - 0.5).abs() < 1e-12);
    }
}
