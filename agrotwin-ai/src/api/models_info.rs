//! Registry readiness endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::registry::ModelInfo;
use crate::AppState;

/// GET /api/ai/models/info
///
/// Reports current state only; never triggers a load.
pub async fn models_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.registry.info())
}

pub fn model_routes() -> Router<AppState> {
    Router::new().route("/api/ai/models/info", get(models_info))
}
