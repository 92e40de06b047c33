//! HTTP request handlers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Deserialize;
use serde_json::json;

use crate::features::{CandidateInput, FeatureExtractor, VacancyInput};

use super::error::{Result, ServerError};
use super::state::AppState;

/// Alerts returned by the alerts endpoint
const ALERTS_ENDPOINT_CAP: usize = 10;

// ============================================================================
// Prediction
// ============================================================================

#[derive(Deserialize)]
pub struct PredictRequest {
    pub candidate: CandidateInput,
    pub vacancy: VacancyInput,
    /// Ground-truth match outcome, when already known (feeds concept drift)
    pub true_label: Option<i64>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<serde_json::Value>> {
    let started = Instant::now();

    let scorer = state
        .scorer
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("No model loaded".to_string()))?;

    let vector = state.extractor.extract(&request.candidate, &request.vacancy);
    let probability = match scorer.predict_proba(&vector) {
        Ok(p) => p,
        Err(e) => {
            state.metrics.record_prediction_error();
            return Err(e.into());
        }
    };
    let prediction = i64::from(probability >= scorer.config().classification_threshold);

    // Best-effort monitoring: a failure here must never fail the request
    let monitoring = {
        let mut guard = state.monitor.write().await;
        guard.as_mut().map(|monitor| {
            let features = state.extractor.monitor_features(
                &request.candidate,
                &request.vacancy,
                prediction,
                probability,
            );
            let result = monitor.monitor_prediction(
                &features,
                request.true_label,
                Some(prediction),
                Some(probability),
            );
            state.metrics.record_monitoring(&result);
            result
        })
    };

    state
        .metrics
        .record_prediction(started.elapsed().as_secs_f64() * 1000.0);

    Ok(Json(json!({
        "prediction": prediction,
        "probability": probability,
        "monitoring": monitoring.map(|result| json!({
            "alerts": result.alerts.len(),
            "data_drift_detected": result
                .data_drift
                .as_ref()
                .map(|r| r.drift_detected)
                .unwrap_or(false),
            "concept_drift_detected": result
                .concept_drift
                .as_ref()
                .map(|r| r.drift_results.concept_drift_detected)
                .unwrap_or(false),
        })),
    })))
}

// ============================================================================
// Drift monitoring
// ============================================================================

#[derive(Deserialize)]
pub struct InitializeDriftRequest {
    /// Historical reference samples per feature
    #[serde(default)]
    pub reference: Option<BTreeMap<String, Vec<f64>>>,
    /// Synthetic samples to generate per feature when no historical data is
    /// supplied
    #[serde(default)]
    pub samples: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

pub async fn initialize_drift(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitializeDriftRequest>,
) -> Result<Json<serde_json::Value>> {
    let mut guard = state.monitor.write().await;
    let monitor = guard
        .as_mut()
        .ok_or_else(|| ServerError::NotFound("Drift monitoring not configured".to_string()))?;

    let reference = match request.reference {
        Some(reference) if !reference.is_empty() => reference,
        _ => {
            let samples = request.samples.ok_or_else(|| {
                ServerError::BadRequest(
                    "Provide reference samples or a synthetic sample count".to_string(),
                )
            })?;
            if samples == 0 {
                return Err(ServerError::BadRequest(
                    "Sample count must be positive".to_string(),
                ));
            }
            synthetic_reference(&state.extractor, samples, request.seed)
        }
    };

    monitor.initialize_reference_data(reference);
    let sizes = monitor.reference_sizes();

    Ok(Json(json!({
        "features": sizes.len(),
        "samples_per_feature": sizes,
    })))
}

pub async fn get_drift_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>> {
    let guard = state.monitor.read().await;
    let monitor = guard
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("Drift monitoring not configured".to_string()))?;

    Ok(Json(serde_json::to_value(monitor.get_drift_summary())?))
}

pub async fn get_drift_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>> {
    let guard = state.monitor.read().await;
    let monitor = guard
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("Drift monitoring not configured".to_string()))?;

    let mut records = monitor.alert_records();
    let total = records.len();
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(ALERTS_ENDPOINT_CAP);

    Ok(Json(json!({
        "total": total,
        "alerts": records,
    })))
}

#[derive(Deserialize, Default)]
pub struct ExportAlertsRequest {
    /// Target file; defaults to a timestamped file in the artifacts dir
    #[serde(default)]
    pub path: Option<String>,
}

pub async fn export_drift_alerts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportAlertsRequest>,
) -> Result<Json<serde_json::Value>> {
    let guard = state.monitor.read().await;
    let monitor = guard
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("Drift monitoring not configured".to_string()))?;

    let path = match request.path {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&state.config.artifacts_dir)?;
            format!(
                "{}/drift_alerts_{}.json",
                state.config.artifacts_dir,
                chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
            )
        }
    };

    let exported = monitor.export_alerts(&path)?;

    Ok(Json(json!({
        "exported": exported,
        "path": path,
    })))
}

// ============================================================================
// Observability
// ============================================================================

pub async fn get_monitoring_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>> {
    Ok(Json(serde_json::to_value(state.metrics.snapshot())?))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let monitoring_configured = state.monitor.read().await.is_some();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.scorer.is_some(),
        "monitoring_configured": monitoring_configured,
    }))
}

// ============================================================================
// Synthetic reference generation
// ============================================================================

/// Draw plausible historical windows for the monitored features when no real
/// history is available (demo and cold-start installs).
fn synthetic_reference(
    extractor: &FeatureExtractor,
    samples: usize,
    seed: Option<u64>,
) -> BTreeMap<String, Vec<f64>> {
    let mut rng = match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };

    let mut reference = BTreeMap::new();
    for name in extractor.monitored_feature_names() {
        let values = (0..samples)
            .map(|_| match name {
                "candidate_text_len" => (1200.0 + 400.0 * standard_normal(&mut rng)).max(0.0),
                "vacancy_text_len" => (800.0 + 250.0 * standard_normal(&mut rng)).max(0.0),
                "seniority_hash" => f64::from(rng.gen_range(0u32..16)),
                "prediction" => f64::from(u8::from(rng.gen::<f64>() < 0.5)),
                _ => rng.gen_range(0.5..1.0),
            })
            .collect();
        reference.insert(name.to_string(), values);
    }

    reference
}

/// Standard normal draw via Box-Muller
fn standard_normal(rng: &mut Xoshiro256PlusPlus) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
