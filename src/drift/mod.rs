//! Drift monitoring module
//!
//! Detects data drift (feature distributions diverging from a reference
//! window) and concept drift (rolling model performance degrading against a
//! validation baseline) for the match-scoring model in production, and
//! unifies both behind a single [`DriftMonitor`] façade safe to call inline
//! on every prediction.

mod concept_drift;
mod data_drift;
mod monitor;

pub use concept_drift::{
    ConceptDriftDetector, ConceptDriftResult, DegradedMetric, PerformanceReport,
    PerformanceSnapshot,
};
pub use data_drift::{DataDriftDetector, DriftReport, FeatureDriftResult};
pub use monitor::{
    ConceptDriftConfig, DataDriftConfig, DriftMonitor, DriftSummary, MonitorConfig,
    MonitoringResult,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of drift an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftType {
    /// Change in the distribution of model inputs
    Data,
    /// Degradation of model performance against its baseline
    Concept,
}

/// Coarse classification of how strongly a drift signal deviates from normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Immutable record of one detected drift event.
///
/// Created exactly once when a detector confirms a drift condition and
/// appended to that detector's alert list; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftAlert {
    /// When the alert was raised
    pub timestamp: DateTime<Utc>,
    /// Data or concept drift
    #[serde(rename = "type")]
    pub drift_type: DriftType,
    /// Severity classification
    pub severity: Severity,
    /// Statistic or performance metric that triggered the alert
    pub metric: String,
    /// Observed statistic value
    pub value: f64,
    /// Threshold that was crossed
    pub threshold: f64,
    /// Human-readable description
    pub message: String,
}

/// KS statistic above this is high severity
pub(crate) const KS_STATISTIC_HIGH: f64 = 0.5;
/// KS statistic above this is medium severity
pub(crate) const KS_STATISTIC_MEDIUM: f64 = 0.3;
/// Cohen's d above this is high severity
pub(crate) const EFFECT_SIZE_HIGH: f64 = 0.8;
/// Cohen's d above this is medium severity
pub(crate) const EFFECT_SIZE_MEDIUM: f64 = 0.5;
/// Relative performance degradation above this escalates to high severity
pub(crate) const DEGRADATION_HIGH: f64 = 0.2;
