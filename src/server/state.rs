//! Application state management

use crate::drift::DriftMonitor;
use crate::features::FeatureExtractor;
use crate::inference::MatchScorer;
use crate::monitoring::ServiceMetrics;
use tokio::sync::RwLock;

use super::ServerConfig;

/// State shared across handlers.
///
/// The drift monitor sits behind one async `RwLock`: `monitor_prediction`
/// mutates detector windows and alert lists, so concurrent requests must
/// serialize through the write guard.
pub struct AppState {
    pub config: ServerConfig,
    pub extractor: FeatureExtractor,
    pub scorer: Option<MatchScorer>,
    pub monitor: RwLock<Option<DriftMonitor>>,
    pub metrics: ServiceMetrics,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        scorer: Option<MatchScorer>,
        monitor: Option<DriftMonitor>,
    ) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::new(),
            scorer,
            monitor: RwLock::new(monitor),
            metrics: ServiceMetrics::default(),
        }
    }
}
