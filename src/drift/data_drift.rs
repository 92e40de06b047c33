//! Data drift detection
//!
//! Compares current feature samples against stored reference windows with a
//! two-sample Kolmogorov-Smirnov test, plus a Cohen's d effect size overlay
//! for practical significance.

use crate::drift::{
    DriftAlert, DriftType, Severity, EFFECT_SIZE_HIGH, EFFECT_SIZE_MEDIUM, KS_STATISTIC_HIGH,
    KS_STATISTIC_MEDIUM,
};
use crate::error::{Result, TalentMatchError};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

/// Minimum buffered observations before a feature takes part in the
/// buffered detection pass; a KS test on fewer samples carries no signal.
pub(crate) const MIN_BUFFERED_SAMPLES: usize = 10;

/// Drift analysis outcome for a single feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDriftResult {
    /// KS statistic D in [0, 1]
    pub ks_statistic: f64,
    /// Asymptotic p-value of the two-sample test
    pub p_value: f64,
    /// Whether the p-value crossed the significance level
    pub drift_detected: bool,
    /// Cohen's d between reference and current sample
    pub effect_size: f64,
    /// Severity classification from statistic and effect size
    pub severity: Severity,
}

/// Result of one `detect_drift` call across all reference features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    /// When the detection ran
    pub timestamp: DateTime<Utc>,
    /// Features compared against their reference window
    pub features_analyzed: usize,
    /// Features whose test rejected distribution equality
    pub features_with_drift: usize,
    /// True if any feature drifted
    pub drift_detected: bool,
    /// Percentage of analyzed features with drift
    pub drift_percentage: f64,
    /// Per-feature test results
    pub feature_results: BTreeMap<String, FeatureDriftResult>,
    /// Reference features skipped (absent from current data or degenerate)
    pub skipped_features: Vec<String>,
    /// Alerts created by this call
    pub alerts: Vec<DriftAlert>,
}

/// Detects changes in feature distributions against a reference window.
///
/// Holds one reference sample per named feature plus a bounded
/// current-window buffer that single observations accumulate into, so the
/// monitoring façade gets multi-call trend detection without bookkeeping on
/// the caller's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDriftDetector {
    significance_level: f64,
    reference_window_size: usize,
    detection_window_size: usize,
    reference_data: BTreeMap<String, Array1<f64>>,
    current_windows: BTreeMap<String, VecDeque<f64>>,
    alerts: Vec<DriftAlert>,
}

impl DataDriftDetector {
    /// Create a new detector.
    ///
    /// `significance_level` must lie in (0, 1); both window sizes must be
    /// positive.
    pub fn new(
        significance_level: f64,
        reference_window_size: usize,
        detection_window_size: usize,
    ) -> Result<Self> {
        if !(significance_level > 0.0 && significance_level < 1.0) {
            return Err(TalentMatchError::InvalidParameter {
                name: "significance_level".to_string(),
                value: significance_level.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if reference_window_size == 0 {
            return Err(TalentMatchError::InvalidParameter {
                name: "reference_window_size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if detection_window_size == 0 {
            return Err(TalentMatchError::InvalidParameter {
                name: "detection_window_size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            significance_level,
            reference_window_size,
            detection_window_size,
            reference_data: BTreeMap::new(),
            current_windows: BTreeMap::new(),
            alerts: Vec::new(),
        })
    }

    /// Replace the reference distributions entirely.
    ///
    /// Keeps the most recent `reference_window_size` values per feature;
    /// features with empty samples are skipped.
    pub fn set_reference_data(&mut self, data: BTreeMap<String, Vec<f64>>) {
        self.reference_data.clear();
        for (feature, values) in data {
            if values.is_empty() {
                warn!(feature = %feature, "empty reference sample, skipping feature");
                continue;
            }
            let start = values.len().saturating_sub(self.reference_window_size);
            self.reference_data
                .insert(feature, Array1::from(values[start..].to_vec()));
        }
        info!(
            features = self.reference_data.len(),
            "reference data set for drift detection"
        );
    }

    /// True once `set_reference_data` has stored at least one feature
    pub fn has_reference(&self) -> bool {
        !self.reference_data.is_empty()
    }

    /// Number of reference samples held per feature
    pub fn reference_sizes(&self) -> BTreeMap<String, usize> {
        self.reference_data
            .iter()
            .map(|(name, values)| (name.clone(), values.len()))
            .collect()
    }

    /// Append a single observation to the feature's bounded current window
    pub fn record_observation(&mut self, feature: &str, value: f64) {
        let window = self
            .current_windows
            .entry(feature.to_string())
            .or_insert_with(VecDeque::new);
        window.push_back(value);
        if window.len() > self.detection_window_size {
            window.pop_front();
        }
    }

    /// Append a multi-element sample to the feature's current window
    pub fn record_series(&mut self, feature: &str, values: &[f64]) {
        for &value in values {
            self.record_observation(feature, value);
        }
    }

    /// Run detection over the accumulated current windows.
    ///
    /// Returns `Ok(None)` when no feature has buffered enough observations
    /// yet. Errors only on the usage error of a missing reference set.
    pub fn detect_buffered(&mut self) -> Result<Option<DriftReport>> {
        let current: BTreeMap<String, Vec<f64>> = self
            .current_windows
            .iter()
            .filter(|(_, window)| window.len() >= MIN_BUFFERED_SAMPLES)
            .map(|(name, window)| (name.clone(), window.iter().copied().collect()))
            .collect();

        if current.is_empty() {
            debug!("no feature window has enough observations yet");
            return Ok(None);
        }

        self.detect_drift(&current).map(Some)
    }

    /// Compare `current_data` against the reference distributions.
    ///
    /// Every reference feature present in `current_data` is tested with the
    /// two-sample KS test over its most recent `detection_window_size`
    /// values. Features missing from the current data, or whose test fails
    /// on degenerate input, are skipped rather than failing the call.
    /// Calling before `set_reference_data` is a usage error.
    pub fn detect_drift(&mut self, current_data: &BTreeMap<String, Vec<f64>>) -> Result<DriftReport> {
        if self.reference_data.is_empty() {
            return Err(TalentMatchError::ValidationError(
                "Reference data not set. Call set_reference_data() first.".to_string(),
            ));
        }

        let mut report = DriftReport {
            timestamp: Utc::now(),
            features_analyzed: 0,
            features_with_drift: 0,
            drift_detected: false,
            drift_percentage: 0.0,
            feature_results: BTreeMap::new(),
            skipped_features: Vec::new(),
            alerts: Vec::new(),
        };

        for (feature, reference) in &self.reference_data {
            let Some(values) = current_data.get(feature) else {
                debug!(feature = %feature, "feature not found in current data");
                report.skipped_features.push(feature.clone());
                continue;
            };

            // Limit current data to the detection window
            let start = values.len().saturating_sub(self.detection_window_size);
            let current = &values[start..];

            let (ks_statistic, p_value) = match ks_2samp(reference, current) {
                Ok(result) => result,
                Err(e) => {
                    warn!(feature = %feature, error = %e, "drift test failed, skipping feature");
                    report.skipped_features.push(feature.clone());
                    continue;
                }
            };

            let drift_detected = p_value < self.significance_level;
            let effect_size = cohens_d(reference, current);
            let severity = classify_severity(ks_statistic, effect_size);

            report.feature_results.insert(
                feature.clone(),
                FeatureDriftResult {
                    ks_statistic,
                    p_value,
                    drift_detected,
                    effect_size,
                    severity,
                },
            );
            report.features_analyzed += 1;

            if drift_detected {
                report.features_with_drift += 1;
                report.drift_detected = true;

                let alert = DriftAlert {
                    timestamp: Utc::now(),
                    drift_type: DriftType::Data,
                    severity,
                    metric: format!("ks_test_{feature}"),
                    value: ks_statistic,
                    threshold: self.significance_level,
                    message: format!(
                        "Data drift detected in feature '{feature}' \
                         (KS={ks_statistic:.4}, p={p_value:.4})"
                    ),
                };

                warn!(
                    feature = %feature,
                    ks_statistic = ks_statistic,
                    p_value = p_value,
                    "data drift detected"
                );

                self.alerts.push(alert.clone());
                report.alerts.push(alert);
            }
        }

        report.drift_percentage =
            report.features_with_drift as f64 / report.features_analyzed.max(1) as f64 * 100.0;

        Ok(report)
    }

    /// All alerts this detector has ever raised, in creation order
    pub fn alerts(&self) -> &[DriftAlert] {
        &self.alerts
    }
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// Returns the statistic D (maximum ECDF distance) and the asymptotic
/// p-value. Empty samples are degenerate input.
fn ks_2samp(reference: &Array1<f64>, current: &[f64]) -> Result<(f64, f64)> {
    if reference.is_empty() || current.is_empty() {
        return Err(TalentMatchError::ComputationError(
            "empty sample in KS test".to_string(),
        ));
    }

    let mut ref_sorted: Vec<f64> = reference.iter().copied().collect();
    let mut cur_sorted: Vec<f64> = current.to_vec();
    ref_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    cur_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n1 = ref_sorted.len() as f64;
    let n2 = cur_sorted.len() as f64;

    // Walk both sorted samples and track the maximum ECDF distance
    let mut i = 0usize;
    let mut j = 0usize;
    let mut d_max = 0.0f64;
    while i < ref_sorted.len() && j < cur_sorted.len() {
        let x = ref_sorted[i].min(cur_sorted[j]);
        while i < ref_sorted.len() && ref_sorted[i] <= x {
            i += 1;
        }
        while j < cur_sorted.len() && cur_sorted[j] <= x {
            j += 1;
        }
        let diff = (i as f64 / n1 - j as f64 / n2).abs();
        d_max = d_max.max(diff);
    }

    let n_eff = n1 * n2 / (n1 + n2);
    let lambda = d_max * n_eff.sqrt();

    Ok((d_max, ks_p_value(lambda)))
}

/// Asymptotic p-value of the Kolmogorov distribution:
/// P(D > d) ~ 2 * sum_{k>=1} (-1)^{k+1} exp(-2 k^2 lambda^2)
fn ks_p_value(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut p = 0.0;
    for k in 1..=100u32 {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let term = sign * (-2.0 * f64::from(k).powi(2) * lambda.powi(2)).exp();
        p += term;
        if term.abs() < 1e-10 {
            break;
        }
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// Cohen's d standardized mean difference; 0 when the pooled standard
/// deviation is 0 or either sample is too small for a sample variance.
fn cohens_d(reference: &Array1<f64>, current: &[f64]) -> f64 {
    let n1 = reference.len();
    let n2 = current.len();
    if n1 + n2 < 3 {
        return 0.0;
    }

    let mean1 = reference.sum() / n1 as f64;
    let mean2 = current.iter().sum::<f64>() / n2 as f64;

    let var1 = sample_variance(reference.iter().copied(), mean1, n1);
    let var2 = sample_variance(current.iter().copied(), mean2, n2);

    let pooled_std = (((n1 as f64 - 1.0) * var1 + (n2 as f64 - 1.0) * var2)
        / (n1 + n2 - 2) as f64)
        .sqrt();

    if pooled_std == 0.0 || !pooled_std.is_finite() {
        return 0.0;
    }

    (mean1 - mean2).abs() / pooled_std
}

/// Unbiased sample variance (ddof = 1); 0 for samples of fewer than two
fn sample_variance(values: impl Iterator<Item = f64>, mean: f64, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    values.map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)
}

fn classify_severity(ks_statistic: f64, effect_size: f64) -> Severity {
    if ks_statistic > KS_STATISTIC_HIGH || effect_size > EFFECT_SIZE_HIGH {
        Severity::High
    } else if ks_statistic > KS_STATISTIC_MEDIUM || effect_size > EFFECT_SIZE_MEDIUM {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DataDriftDetector {
        DataDriftDetector::new(0.05, 1000, 100).unwrap()
    }

    #[test]
    fn test_constructor_rejects_bad_parameters() {
        assert!(DataDriftDetector::new(0.0, 1000, 100).is_err());
        assert!(DataDriftDetector::new(1.0, 1000, 100).is_err());
        assert!(DataDriftDetector::new(0.05, 0, 100).is_err());
        assert!(DataDriftDetector::new(0.05, 1000, 0).is_err());
    }

    #[test]
    fn test_detect_before_reference_is_usage_error() {
        let mut det = detector();
        let current = BTreeMap::from([("x".to_string(), vec![1.0, 2.0])]);
        assert!(det.detect_drift(&current).is_err());
    }

    #[test]
    fn test_ks_identical_samples() {
        let a = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let (d, p) = ks_2samp(&a, &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(d.abs() < 1e-12);
        assert!(p > 0.99);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a = Array1::from((0..100).map(f64::from).collect::<Vec<_>>());
        let b: Vec<f64> = (1000..1100).map(f64::from).collect();
        let (d, p) = ks_2samp(&a, &b).unwrap();
        assert!((d - 1.0).abs() < 1e-12);
        assert!(p < 1e-6);
    }

    #[test]
    fn test_ks_rejects_empty_sample() {
        let a = Array1::from(vec![1.0, 2.0]);
        assert!(ks_2samp(&a, &[]).is_err());
    }

    #[test]
    fn test_cohens_d_zero_variance() {
        let a = Array1::from(vec![3.0, 3.0, 3.0]);
        assert_eq!(cohens_d(&a, &[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_severity_cutoffs() {
        assert_eq!(classify_severity(0.6, 0.0), Severity::High);
        assert_eq!(classify_severity(0.0, 0.9), Severity::High);
        assert_eq!(classify_severity(0.4, 0.0), Severity::Medium);
        assert_eq!(classify_severity(0.0, 0.6), Severity::Medium);
        assert_eq!(classify_severity(0.1, 0.1), Severity::Low);
    }

    #[test]
    fn test_missing_feature_skipped_not_analyzed() {
        let mut det = detector();
        det.set_reference_data(BTreeMap::from([
            ("a".to_string(), vec![1.0, 2.0, 3.0, 4.0]),
            ("b".to_string(), vec![1.0, 2.0, 3.0, 4.0]),
        ]));

        let current = BTreeMap::from([("a".to_string(), vec![1.0, 2.0, 3.0, 4.0])]);
        let report = det.detect_drift(&current).unwrap();

        assert_eq!(report.features_analyzed, 1);
        assert_eq!(report.skipped_features, vec!["b".to_string()]);
        assert!(!report.feature_results.contains_key("b"));
    }

    #[test]
    fn test_detection_window_uses_most_recent_slice() {
        let mut det = DataDriftDetector::new(0.05, 1000, 5).unwrap();
        let reference: Vec<f64> = (0..200).map(|i| 100.0 + (i % 7) as f64).collect();
        det.set_reference_data(BTreeMap::from([("x".to_string(), reference)]));

        // Old values far from the reference, recent tail matching it; with
        // window 5, only the tail is compared and no drift fires.
        let mut current: Vec<f64> = vec![0.0; 100];
        current.extend([100.0, 101.0, 103.0, 104.0, 106.0]);
        let report = det
            .detect_drift(&BTreeMap::from([("x".to_string(), current)]))
            .unwrap();

        assert!(!report.drift_detected);
    }

    #[test]
    fn test_reference_window_keeps_most_recent() {
        let mut det = DataDriftDetector::new(0.05, 10, 100).unwrap();
        let values: Vec<f64> = (0..50).map(f64::from).collect();
        det.set_reference_data(BTreeMap::from([("x".to_string(), values)]));
        assert_eq!(det.reference_sizes()["x"], 10);
    }

    #[test]
    fn test_observation_buffer_is_bounded() {
        let mut det = DataDriftDetector::new(0.05, 1000, 3).unwrap();
        for i in 0..10 {
            det.record_observation("x", f64::from(i));
        }
        assert_eq!(det.current_windows["x"].len(), 3);
        assert_eq!(det.current_windows["x"].front(), Some(&7.0));
    }

    #[test]
    fn test_detect_buffered_waits_for_min_samples() {
        let mut det = detector();
        det.set_reference_data(BTreeMap::from([(
            "x".to_string(),
            (0..100).map(f64::from).collect(),
        )]));

        for i in 0..MIN_BUFFERED_SAMPLES - 1 {
            det.record_observation("x", i as f64);
        }
        assert!(det.detect_buffered().unwrap().is_none());

        det.record_observation("x", 42.0);
        let report = det.detect_buffered().unwrap().unwrap();
        assert_eq!(report.features_analyzed, 1);
    }

    #[test]
    fn test_shifted_distribution_raises_high_severity_alert() {
        let mut det = detector();
        let reference: Vec<f64> = (0..500).map(|i| (i % 100) as f64 / 100.0).collect();
        det.set_reference_data(BTreeMap::from([("x".to_string(), reference)]));

        let shifted: Vec<f64> = (0..50).map(|i| 50.0 + (i % 100) as f64 / 100.0).collect();
        let report = det
            .detect_drift(&BTreeMap::from([("x".to_string(), shifted)]))
            .unwrap();

        assert!(report.drift_detected);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].severity, Severity::High);
        assert_eq!(report.alerts[0].metric, "ks_test_x");
        assert_eq!(det.alerts().len(), 1);
    }
}
