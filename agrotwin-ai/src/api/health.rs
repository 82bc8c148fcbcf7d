//! Service descriptor and health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

pub const MODULE_NAME: &str = "agrotwin-ai";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` once every predictor is loaded, else `unhealthy`
    pub status: String,
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub models_loaded: bool,
    pub validators_loaded: usize,
    /// Last model-load failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health, GET /api/ai/health
///
/// Attempts a lazy model load when the registry is not ready yet, so a
/// health check after the artifacts appear brings the service up. Always
/// 200; readiness is carried in `status`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    if !state.registry.is_ready() {
        match state.registry.load().await {
            Ok(_) => state.record_error(None).await,
            Err(e) => {
                warn!("Health check model load failed: {}", e);
                state.record_error(Some(e.to_string())).await;
            }
        }
    }

    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let info = state.registry.info();

    Json(HealthResponse {
        status: if info.models_loaded { "healthy" } else { "unhealthy" }.to_string(),
        module: MODULE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        models_loaded: info.models_loaded,
        validators_loaded: info.crop_validators_count,
        last_error: state.last_error.read().await.clone(),
    })
}

/// GET /
pub async fn service_descriptor() -> Json<Value> {
    Json(json!({
        "service": MODULE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /api/ai/health",
            "models_info": "GET /api/ai/models/info",
            "analyze": "POST /api/ai/analyze",
            "analyze_daily": "POST /api/ai/analyze-daily",
        },
    }))
}

pub fn service_routes() -> Router<AppState> {
    Router::new().route("/", get(service_descriptor))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ai/health", get(health_check))
}
