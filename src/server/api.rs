//! API route definitions

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{handlers, state::AppState};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. Check /api/health for API status.",
        })),
    )
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Inference
        .route("/predict", post(handlers::predict))
        // Drift monitoring
        .route("/drift/initialize", post(handlers::initialize_drift))
        .route("/drift/status", get(handlers::get_drift_status))
        .route("/drift/alerts", get(handlers::get_drift_alerts))
        .route("/drift/export", post(handlers::export_drift_alerts))
        // Observability
        .route("/monitoring/stats", get(handlers::get_monitoring_stats))
        .route("/health", get(handlers::health_check))
        .fallback(handle_404);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes)
        .fallback(handle_404)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
