//! HTTP serving layer
//!
//! REST API for match scoring plus the drift monitoring surface: reference
//! initialization, drift status/alerts, alert export, and service metrics.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::drift::DriftMonitor;
use crate::inference::{InferenceConfig, MatchScorer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the JSON model artifact
    pub model_path: String,
    /// Directory alert exports land in
    pub artifacts_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "./models/match_model.json".to_string()),
            artifacts_dir: std::env::var("ARTIFACTS_DIR")
                .unwrap_or_else(|_| "./artifacts".to_string()),
        }
    }
}

/// Start the server with the given configuration.
///
/// A missing or unreadable model artifact is not fatal: the service starts
/// without a scorer, prediction and drift routes answer 404, and health
/// reports the degraded state.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let scorer = match MatchScorer::load(InferenceConfig::new(), &config.model_path) {
        Ok(scorer) => Some(scorer),
        Err(e) => {
            warn!(
                path = %config.model_path,
                error = %e,
                "model artifact not loaded, serving without a model"
            );
            None
        }
    };

    let monitor = match &scorer {
        Some(scorer) => {
            let metrics = scorer.validation_metrics();
            let baseline: Option<BTreeMap<String, f64>> = if metrics.is_empty() {
                None
            } else {
                Some(metrics.clone())
            };
            Some(DriftMonitor::new(baseline, None)?)
        }
        None => None,
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, scorer, monitor));
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "talentmatch server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
