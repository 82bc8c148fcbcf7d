//! Error types for agrotwin-ai
//!
//! [`AnalysisError`] is the typed failure of the analysis pipeline.
//! [`ApiError`] maps it, and request-parsing failures, onto HTTP.
//! Ledger failures never appear here; they are recorded on the insight row.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

use crate::registry::{LoadError, PredictError};

/// Pipeline failures
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed or out-of-range input, unknown mode, unresolvable crop
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Predictor artifacts missing or corrupt
    #[error("Models not loaded: {0}")]
    Load(#[from] LoadError),

    /// Operation requires a ready registry
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A predictor call failed; the whole analysis is aborted
    #[error("Inference failed: {0}")]
    Inference(String),

    /// No telemetry for the requested date
    #[error("No sensor data found for date {0}")]
    NoData(NaiveDate),

    /// Reading the telemetry table failed or timed out
    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    /// Writing the daily insight failed
    #[error("Failed to save daily insight: {0}")]
    Persist(#[source] agrotwin_common::Error),
}

impl From<PredictError> for AnalysisError {
    fn from(err: PredictError) -> Self {
        AnalysisError::Inference(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Models unavailable (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let message = err.to_string();
        match err {
            AnalysisError::Validation(_) => ApiError::BadRequest(message),
            AnalysisError::NoData(_) => ApiError::NotFound(message),
            AnalysisError::Load(_) | AnalysisError::Precondition(_) => {
                ApiError::Unavailable(message)
            }
            AnalysisError::Inference(_)
            | AnalysisError::Aggregation(_)
            | AnalysisError::Persist(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "MODELS_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
