//! Unified drift monitoring façade
//!
//! Single entry point combining the data and concept drift detectors for one
//! observed prediction event. Detection here is best-effort by contract: a
//! monitoring failure degrades to an absent report section and can never
//! fail the inference request that triggered it.

use crate::drift::{
    ConceptDriftDetector, DataDriftDetector, DriftAlert, DriftReport, PerformanceReport,
};
use crate::error::Result;
use crate::features::FeatureValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};

/// Alerts of each type returned by `get_drift_summary`
const SUMMARY_RECENT_ALERTS: usize = 5;

/// Data drift detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDriftConfig {
    /// P-value threshold for the KS test
    pub significance_level: f64,
    /// Reference samples kept per feature
    pub reference_window_size: usize,
    /// Current samples compared per feature
    pub detection_window_size: usize,
}

impl Default for DataDriftConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            reference_window_size: 1000,
            detection_window_size: 100,
        }
    }
}

/// Concept drift detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptDriftConfig {
    /// Acceptable relative performance drop (0.1 = 10%)
    pub degradation_threshold: f64,
    /// Performance snapshots kept in the rolling window
    pub window_size: usize,
}

impl Default for ConceptDriftConfig {
    fn default() -> Self {
        Self {
            degradation_threshold: 0.1,
            window_size: 100,
        }
    }
}

/// Configuration for both detectors; unspecified options keep their defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub data_drift: DataDriftConfig,
    pub concept_drift: ConceptDriftConfig,
}

/// Result of monitoring one prediction event
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringResult {
    pub timestamp: DateTime<Utc>,
    pub monitoring_active: bool,
    /// Data drift report, absent when detection was skipped or failed
    pub data_drift: Option<DriftReport>,
    /// Concept drift report, absent without a detector or labels
    pub concept_drift: Option<PerformanceReport>,
    /// Alerts from both paths, data drift first
    pub alerts: Vec<DriftAlert>,
}

/// Aggregate monitoring state returned by `get_drift_summary`
#[derive(Debug, Clone, Serialize)]
pub struct DriftSummary {
    pub monitoring_active: bool,
    pub data_drift_alerts: usize,
    pub concept_drift_alerts: usize,
    pub last_data_drift_alerts: Vec<DriftAlert>,
    pub last_concept_drift_alerts: Vec<DriftAlert>,
    pub performance_history_size: usize,
}

/// Owns both detectors and aggregates their alert streams.
///
/// Constructed once at service startup and held behind the serving layer's
/// lock; all mutation goes through `&mut self`, so a concurrent host
/// serializes calls through its guard (alert appends and window evictions
/// race otherwise).
#[derive(Debug)]
pub struct DriftMonitor {
    data_drift_detector: DataDriftDetector,
    concept_drift_detector: Option<ConceptDriftDetector>,
    monitoring_active: bool,
}

impl DriftMonitor {
    /// Create a monitor.
    ///
    /// Without `baseline_performance` the concept drift detector is not
    /// constructed and every concept-drift-dependent path reports the
    /// section as unavailable instead of erroring.
    pub fn new(
        baseline_performance: Option<BTreeMap<String, f64>>,
        config: Option<MonitorConfig>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();

        let data_drift_detector = DataDriftDetector::new(
            config.data_drift.significance_level,
            config.data_drift.reference_window_size,
            config.data_drift.detection_window_size,
        )?;

        let concept_drift_detector = match baseline_performance {
            Some(baseline) => Some(ConceptDriftDetector::new(
                baseline,
                config.concept_drift.degradation_threshold,
                config.concept_drift.window_size,
            )?),
            None => {
                warn!("concept drift detector not initialized: baseline performance not provided");
                None
            }
        };

        Ok(Self {
            data_drift_detector,
            concept_drift_detector,
            monitoring_active: true,
        })
    }

    /// Set the reference distributions for data drift detection.
    ///
    /// Must run before the first `monitor_prediction` for data drift results
    /// to be meaningful; until then the data section is silently absent.
    pub fn initialize_reference_data(&mut self, reference_data: BTreeMap<String, Vec<f64>>) {
        self.data_drift_detector.set_reference_data(reference_data);
        info!("reference data initialized for drift monitoring");
    }

    /// Reference samples currently held per feature
    pub fn reference_sizes(&self) -> BTreeMap<String, usize> {
        self.data_drift_detector.reference_sizes()
    }

    /// Monitor a single prediction event.
    ///
    /// Feature values accumulate into the data detector's bounded current
    /// windows; detection then runs over every window with enough samples.
    /// When a concept detector exists and both labels are supplied, the
    /// rolling performance is updated with the one-element outcome. Both
    /// paths are best-effort; failures are logged and degrade to an absent
    /// section.
    pub fn monitor_prediction(
        &mut self,
        features: &BTreeMap<String, FeatureValue>,
        y_true: Option<i64>,
        y_pred: Option<i64>,
        y_pred_proba: Option<f64>,
    ) -> MonitoringResult {
        if !self.monitoring_active {
            return MonitoringResult {
                timestamp: Utc::now(),
                monitoring_active: false,
                data_drift: None,
                concept_drift: None,
                alerts: Vec::new(),
            };
        }

        for (name, value) in features {
            match value {
                FeatureValue::Scalar(v) => self.data_drift_detector.record_observation(name, *v),
                FeatureValue::Series(vs) => self.data_drift_detector.record_series(name, vs),
            }
        }

        let data_drift = if self.data_drift_detector.has_reference() {
            match self.data_drift_detector.detect_buffered() {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %e, "data drift detection failed");
                    None
                }
            }
        } else {
            debug!("reference data not initialized, skipping data drift detection");
            None
        };

        let concept_drift = match (&mut self.concept_drift_detector, y_true, y_pred) {
            (Some(detector), Some(truth), Some(pred)) => {
                let proba = y_pred_proba.map(|p| vec![p]);
                match detector.update_performance(&[truth], &[pred], proba.as_deref()) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        warn!(error = %e, "concept drift update failed");
                        None
                    }
                }
            }
            _ => None,
        };

        let mut alerts = Vec::new();
        if let Some(report) = &data_drift {
            alerts.extend(report.alerts.iter().cloned());
        }
        if let Some(report) = &concept_drift {
            alerts.extend(report.drift_results.alerts.iter().cloned());
        }

        MonitoringResult {
            timestamp: Utc::now(),
            monitoring_active: true,
            data_drift,
            concept_drift,
            alerts,
        }
    }

    /// Aggregate alert counts, most recent alerts, and history size
    pub fn get_drift_summary(&self) -> DriftSummary {
        let data_alerts = self.data_drift_detector.alerts();
        let concept_alerts = self
            .concept_drift_detector
            .as_ref()
            .map(|d| d.alerts())
            .unwrap_or(&[]);

        DriftSummary {
            monitoring_active: self.monitoring_active,
            data_drift_alerts: data_alerts.len(),
            concept_drift_alerts: concept_alerts.len(),
            last_data_drift_alerts: recent(data_alerts),
            last_concept_drift_alerts: recent(concept_alerts),
            performance_history_size: self
                .concept_drift_detector
                .as_ref()
                .map(|d| d.history_len())
                .unwrap_or(0),
        }
    }

    /// Every alert from both detectors, data drift first, each group in
    /// chronological order
    pub fn alert_records(&self) -> Vec<DriftAlert> {
        let mut records: Vec<DriftAlert> = self.data_drift_detector.alerts().to_vec();
        if let Some(detector) = &self.concept_drift_detector {
            records.extend(detector.alerts().iter().cloned());
        }
        records
    }

    /// Write every alert as a JSON array to `path`.
    ///
    /// Returns the number of alerts written; in-memory alert lists are left
    /// untouched.
    pub fn export_alerts(&self, path: impl AsRef<Path>) -> Result<usize> {
        let records = self.alert_records();
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &records)?;
        info!(
            alerts = records.len(),
            path = %path.as_ref().display(),
            "exported drift alerts"
        );
        Ok(records.len())
    }

    /// Whether `monitor_prediction` currently does anything
    pub fn is_active(&self) -> bool {
        self.monitoring_active
    }

    /// Kill switch: make `monitor_prediction` a no-op
    pub fn pause(&mut self) {
        self.monitoring_active = false;
    }

    /// Re-enable monitoring after `pause`
    pub fn resume(&mut self) {
        self.monitoring_active = true;
    }
}

fn recent(alerts: &[DriftAlert]) -> Vec<DriftAlert> {
    let start = alerts.len().saturating_sub(SUMMARY_RECENT_ALERTS);
    alerts[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_features(value: f64) -> BTreeMap<String, FeatureValue> {
        BTreeMap::from([("x".to_string(), FeatureValue::Scalar(value))])
    }

    #[test]
    fn test_config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.data_drift.significance_level, 0.05);
        assert_eq!(config.data_drift.reference_window_size, 1000);
        assert_eq!(config.data_drift.detection_window_size, 100);
        assert_eq!(config.concept_drift.degradation_threshold, 0.1);
        assert_eq!(config.concept_drift.window_size, 100);
    }

    #[test]
    fn test_config_partial_override_from_json() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"data_drift": {"significance_level": 0.01}}"#).unwrap();
        assert_eq!(config.data_drift.significance_level, 0.01);
        assert_eq!(config.data_drift.reference_window_size, 1000);
        assert_eq!(config.concept_drift.window_size, 100);
    }

    #[test]
    fn test_summary_after_zero_activity() {
        let monitor = DriftMonitor::new(None, None).unwrap();
        let summary = monitor.get_drift_summary();
        assert!(summary.monitoring_active);
        assert_eq!(summary.data_drift_alerts, 0);
        assert_eq!(summary.concept_drift_alerts, 0);
        assert_eq!(summary.performance_history_size, 0);
        assert!(summary.last_data_drift_alerts.is_empty());
    }

    #[test]
    fn test_no_baseline_degrades_concept_section() {
        let mut monitor = DriftMonitor::new(None, None).unwrap();
        let result = monitor.monitor_prediction(&scalar_features(1.0), Some(1), Some(1), Some(0.9));
        assert!(result.monitoring_active);
        assert!(result.concept_drift.is_none());
    }

    #[test]
    fn test_paused_monitor_short_circuits() {
        let mut monitor = DriftMonitor::new(None, None).unwrap();
        monitor.pause();
        let result = monitor.monitor_prediction(&scalar_features(1.0), Some(1), Some(0), None);
        assert!(!result.monitoring_active);
        assert!(result.data_drift.is_none());
        assert!(result.concept_drift.is_none());
        assert!(result.alerts.is_empty());

        monitor.resume();
        assert!(monitor.is_active());
    }

    #[test]
    fn test_data_drift_skipped_without_reference() {
        let mut monitor = DriftMonitor::new(None, None).unwrap();
        for i in 0..20 {
            let result = monitor.monitor_prediction(&scalar_features(f64::from(i)), None, None, None);
            assert!(result.data_drift.is_none());
        }
    }

    #[test]
    fn test_buffered_observations_trigger_detection() {
        let mut monitor = DriftMonitor::new(None, None).unwrap();
        let reference: Vec<f64> = (0..500).map(|i| (i % 10) as f64 / 10.0).collect();
        monitor.initialize_reference_data(BTreeMap::from([("x".to_string(), reference)]));

        // Far-off observations accumulate until the buffer is deep enough,
        // then detection fires with a data alert.
        let mut saw_alert = false;
        for _ in 0..20 {
            let result = monitor.monitor_prediction(&scalar_features(500.0), None, None, None);
            if result
                .alerts
                .iter()
                .any(|a| a.drift_type == crate::drift::DriftType::Data)
            {
                saw_alert = true;
            }
        }
        assert!(saw_alert);
        assert!(monitor.get_drift_summary().data_drift_alerts > 0);
    }

    #[test]
    fn test_concept_drift_updates_history() {
        let baseline = BTreeMap::from([("accuracy".to_string(), 0.9)]);
        let mut monitor = DriftMonitor::new(Some(baseline), None).unwrap();

        let result = monitor.monitor_prediction(&scalar_features(1.0), Some(1), Some(1), Some(0.8));
        assert!(result.concept_drift.is_some());
        assert_eq!(monitor.get_drift_summary().performance_history_size, 1);
    }

    #[test]
    fn test_alert_records_data_first() {
        let baseline = BTreeMap::from([("accuracy".to_string(), 0.95)]);
        let config = MonitorConfig {
            concept_drift: ConceptDriftConfig {
                degradation_threshold: 0.1,
                window_size: 10,
            },
            ..MonitorConfig::default()
        };
        let mut monitor = DriftMonitor::new(Some(baseline), Some(config)).unwrap();

        let reference: Vec<f64> = (0..200).map(|i| (i % 10) as f64).collect();
        monitor.initialize_reference_data(BTreeMap::from([("x".to_string(), reference)]));

        // Wrong labels plus far-off feature values: both detectors fire.
        for _ in 0..15 {
            monitor.monitor_prediction(&scalar_features(1e6), Some(1), Some(0), None);
        }

        let records = monitor.alert_records();
        assert!(!records.is_empty());
        let first_concept = records
            .iter()
            .position(|a| a.drift_type == crate::drift::DriftType::Concept);
        let last_data = records
            .iter()
            .rposition(|a| a.drift_type == crate::drift::DriftType::Data);
        if let (Some(first_concept), Some(last_data)) = (first_concept, last_data) {
            assert!(last_data < first_concept);
        }
    }
}
