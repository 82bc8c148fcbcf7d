//! agrotwin-ai library interface
//!
//! Exposes the analysis services and the HTTP router for integration tests
//! and for the `agrotwin-ai` binary.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::registry::ModelRegistry;
use crate::services::{DailyAnalysisService, SoilAnalyzer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub analyzer: SoilAnalyzer,
    pub daily: Arc<DailyAnalysisService>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last model-load failure, reported by the health endpoint
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(analyzer: SoilAnalyzer, daily: Arc<DailyAnalysisService>) -> Self {
        Self {
            registry: Arc::clone(analyzer.registry()),
            analyzer,
            daily,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember (or clear) the most recent load failure
    pub async fn record_error(&self, error: Option<String>) {
        *self.last_error.write().await = error;
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::service_routes())
        .merge(api::health_routes())
        .merge(api::model_routes())
        .merge(api::analyze_routes())
        .merge(api::daily_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
