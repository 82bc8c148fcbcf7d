//! POST /api/ai/analyze-daily

use agrotwin_common::time::{parse_date, DATE_FORMAT};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::DailyAnalysisReport;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DailyAnalysisRequest {
    /// `YYYY-MM-DD`, local calendar day
    pub date: String,
}

/// Aggregate, analyze and persist one day
///
/// Responds once the insight row is saved; the ledger publish continues in
/// the background and is not awaited.
pub async fn analyze_daily(
    State(state): State<AppState>,
    Json(request): Json<DailyAnalysisRequest>,
) -> ApiResult<Json<DailyAnalysisReport>> {
    let date = parse_date(request.date.trim()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid date '{}', expected {}",
            request.date, DATE_FORMAT
        ))
    })?;

    let run = state.daily.run(date).await?;
    info!(
        date = %date,
        insight_id = run.report.record_id,
        ledger = run.ledger.is_some(),
        "Daily analysis request completed"
    );
    Ok(Json(run.report))
}

pub fn daily_routes() -> Router<AppState> {
    Router::new().route("/api/ai/analyze-daily", post(analyze_daily))
}
