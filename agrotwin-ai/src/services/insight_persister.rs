//! Insight persister
//!
//! Derives the headline status and summary line, then upserts the day's
//! row. Not retried here; the date key makes a caller retry safe.

use sqlx::SqlitePool;
use tracing::{error, info};

use crate::db::{self, NewInsight};
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, DailyAggregate, SavedInsight, SummaryStatus};

/// One-line human summary of an analysis
pub fn summary_text(result: &AnalysisResult) -> String {
    format!(
        "Soil Health: {} ({:.1}/100). Recommended crop: {}. {}",
        result.soil_health.rating,
        result.soil_health.overall_score,
        result.crop_recommendation.best_crop,
        if result.anomaly_detection.is_anomaly {
            "ANOMALY DETECTED!"
        } else {
            "Normal conditions."
        }
    )
}

#[derive(Clone)]
pub struct InsightPersister {
    pool: SqlitePool,
}

impl InsightPersister {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write the day's insight; returns the row id and its new revision
    pub async fn upsert(
        &self,
        aggregate: &DailyAggregate,
        analysis: &AnalysisResult,
    ) -> Result<SavedInsight, AnalysisError> {
        let summary_status = SummaryStatus::derive(analysis);
        let summary_text = summary_text(analysis);

        let saved = db::upsert_insight(
            &self.pool,
            &NewInsight {
                aggregate,
                analysis,
                summary_status,
                summary_text: &summary_text,
            },
        )
        .await
        .map_err(|e| {
            error!(date = %aggregate.date, "Failed to save daily insight: {}", e);
            AnalysisError::Persist(e)
        })?;

        info!(
            date = %aggregate.date,
            insight_id = saved.id,
            revision = saved.revision,
            status = summary_status.as_str(),
            "Saved daily insight"
        );
        Ok(saved)
    }
}
