//! POST /api/ai/analyze

use axum::{extract::State, routing::post, Json, Router};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisResult, SoilDataInput};
use crate::AppState;

/// Analyze one soil sample
///
/// Body rejections (missing or mistyped fields) surface as axum's own 4xx
/// responses; range and mode violations come back as 400 from validation.
pub async fn analyze(
    State(state): State<AppState>,
    Json(input): Json<SoilDataInput>,
) -> ApiResult<Json<AnalysisResult>> {
    debug!(mode = %input.mode, crop = ?input.selected_crop, "Analyze request");

    match state.analyzer.analyze(&input).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            if let crate::AnalysisError::Load(load) = &e {
                state.record_error(Some(load.to_string())).await;
            }
            Err(ApiError::from(e))
        }
    }
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/ai/analyze", post(analyze))
}
