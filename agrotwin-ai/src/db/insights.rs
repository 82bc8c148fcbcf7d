//! Daily insight persistence
//!
//! One row per date. Re-running a day overwrites the row in place and resets
//! the ledger columns, since a fresh publish follows every write. Each write
//! bumps `revision`; ledger outcomes for an older revision are dropped.

use agrotwin_common::time::{format_local, now, DATE_FORMAT};
use agrotwin_common::{Error, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use crate::models::{
    AnalysisResult, DailyAggregate, DailyInsight, LedgerStatus, SavedInsight, SummaryStatus,
};

/// Everything written for one date
#[derive(Debug, Clone, Copy)]
pub struct NewInsight<'a> {
    pub aggregate: &'a DailyAggregate,
    pub analysis: &'a AnalysisResult,
    pub summary_status: SummaryStatus,
    pub summary_text: &'a str,
}

/// A saved insight whose ledger publish has not been confirmed
#[derive(Debug, Clone)]
pub struct UnconfirmedInsight {
    pub saved: SavedInsight,
    pub date: NaiveDate,
    pub sample_count: i64,
    pub analysis: AnalysisResult,
}

fn local_timestamp() -> String {
    format_local(&now().naive_local())
}

/// Insert or overwrite the row for `insight.aggregate.date`
pub async fn upsert_insight(pool: &SqlitePool, insight: &NewInsight<'_>) -> Result<SavedInsight> {
    // Serialize before touching the database
    let analysis_json = serde_json::to_string(insight.analysis)
        .map_err(|e| Error::Internal(format!("Failed to serialize analysis: {}", e)))?;
    let recommendations_json = serde_json::to_string(&insight.analysis.recommendations)
        .map_err(|e| Error::Internal(format!("Failed to serialize recommendations: {}", e)))?;

    let aggregate = insight.aggregate;
    let features = &aggregate.features;
    let analysis = insight.analysis;
    let updated_at = local_timestamp();

    let row = sqlx::query(
        r#"
        INSERT INTO daily_insights (
            date, total_readings,
            soil_temperature_avg, soil_moisture_avg, conductivity_median, ph_avg,
            nitrogen_avg, phosphorus_avg, potassium_avg, salt_median,
            air_temperature_avg, air_humidity_avg, is_raining_majority,
            soil_temperature_min, soil_temperature_max, soil_moisture_min, soil_moisture_max,
            recommended_crop, crop_confidence, soil_health_score, soil_health_rating,
            has_anomaly, anomaly_score, summary_status, summary_text,
            analysis_json, recommendations_json,
            ledger_status, ledger_tx_hash, ledger_block_number, ledger_pushed_at,
            created_at, updated_at
        ) VALUES (
            ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
            'pending', NULL, NULL, NULL, ?, ?
        )
        ON CONFLICT(date) DO UPDATE SET
            total_readings = excluded.total_readings,
            soil_temperature_avg = excluded.soil_temperature_avg,
            soil_moisture_avg = excluded.soil_moisture_avg,
            conductivity_median = excluded.conductivity_median,
            ph_avg = excluded.ph_avg,
            nitrogen_avg = excluded.nitrogen_avg,
            phosphorus_avg = excluded.phosphorus_avg,
            potassium_avg = excluded.potassium_avg,
            salt_median = excluded.salt_median,
            air_temperature_avg = excluded.air_temperature_avg,
            air_humidity_avg = excluded.air_humidity_avg,
            is_raining_majority = excluded.is_raining_majority,
            soil_temperature_min = excluded.soil_temperature_min,
            soil_temperature_max = excluded.soil_temperature_max,
            soil_moisture_min = excluded.soil_moisture_min,
            soil_moisture_max = excluded.soil_moisture_max,
            recommended_crop = excluded.recommended_crop,
            crop_confidence = excluded.crop_confidence,
            soil_health_score = excluded.soil_health_score,
            soil_health_rating = excluded.soil_health_rating,
            has_anomaly = excluded.has_anomaly,
            anomaly_score = excluded.anomaly_score,
            summary_status = excluded.summary_status,
            summary_text = excluded.summary_text,
            analysis_json = excluded.analysis_json,
            recommendations_json = excluded.recommendations_json,
            ledger_status = 'pending',
            ledger_tx_hash = NULL,
            ledger_block_number = NULL,
            ledger_pushed_at = NULL,
            revision = daily_insights.revision + 1,
            updated_at = excluded.updated_at
        RETURNING id, revision
        "#,
    )
    .bind(aggregate.date.format(DATE_FORMAT).to_string())
    .bind(aggregate.sample_count)
    .bind(features.soil_temperature)
    .bind(features.soil_moisture)
    .bind(features.conductivity)
    .bind(features.ph)
    .bind(features.nitrogen)
    .bind(features.phosphorus)
    .bind(features.potassium)
    .bind(features.salt)
    .bind(features.air_temperature)
    .bind(features.air_humidity)
    .bind(features.is_raining as i64)
    .bind(aggregate.metadata.min_soil_temp)
    .bind(aggregate.metadata.max_soil_temp)
    .bind(aggregate.metadata.min_moisture)
    .bind(aggregate.metadata.max_moisture)
    .bind(&analysis.crop_recommendation.best_crop)
    .bind(analysis.crop_recommendation.confidence)
    .bind(analysis.soil_health.overall_score)
    .bind(analysis.soil_health.rating.as_str())
    .bind(analysis.anomaly_detection.is_anomaly as i64)
    .bind(analysis.anomaly_detection.anomaly_score)
    .bind(insight.summary_status.as_str())
    .bind(insight.summary_text)
    .bind(&analysis_json)
    .bind(&recommendations_json)
    .bind(&updated_at)
    .bind(&updated_at)
    .fetch_one(pool)
    .await?;

    Ok(SavedInsight {
        id: row.get("id"),
        revision: row.get("revision"),
    })
}

/// Record the outcome of a ledger publish on an already-committed row
///
/// Applies only while the row is still at `saved.revision`. Returns `false`
/// when a later upsert superseded it; that write's own publish owns the
/// ledger columns. `ledger_pushed_at` is the time of the attempt, whatever
/// its outcome.
pub async fn update_ledger_status(
    pool: &SqlitePool,
    saved: SavedInsight,
    status: LedgerStatus,
    tx_hash: Option<&str>,
    block_number: Option<i64>,
) -> Result<bool> {
    let pushed_at = local_timestamp();

    let result = sqlx::query(
        r#"
        UPDATE daily_insights
        SET ledger_status = ?, ledger_tx_hash = ?, ledger_block_number = ?, ledger_pushed_at = ?
        WHERE id = ? AND revision = ?
        "#,
    )
    .bind(status.as_str())
    .bind(tx_hash)
    .bind(block_number)
    .bind(&pushed_at)
    .bind(saved.id)
    .bind(saved.revision)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Most recent `pending` or `failed` insights, newest date first
pub async fn fetch_unconfirmed_insights(pool: &SqlitePool, limit: i64) -> Result<Vec<UnconfirmedInsight>> {
    let rows = sqlx::query(
        r#"
        SELECT id, revision, date, total_readings, analysis_json
        FROM daily_insights
        WHERE ledger_status != 'confirmed'
        ORDER BY date DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let date: String = row.get("date");
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| Error::Internal(format!("Bad insight date '{}': {}", date, e)))?;
            let analysis_json: String = row.get("analysis_json");
            let analysis: AnalysisResult = serde_json::from_str(&analysis_json)
                .map_err(|e| Error::Internal(format!("Bad analysis for {}: {}", date, e)))?;

            Ok(UnconfirmedInsight {
                saved: SavedInsight {
                    id: row.get("id"),
                    revision: row.get("revision"),
                },
                date,
                sample_count: row.get("total_readings"),
                analysis,
            })
        })
        .collect()
}

pub async fn fetch_insight_by_date(pool: &SqlitePool, date: NaiveDate) -> Result<Option<DailyInsight>> {
    let row = sqlx::query(
        r#"
        SELECT id, date, total_readings, recommended_crop, crop_confidence,
               soil_health_score, soil_health_rating, has_anomaly,
               summary_status, summary_text, ledger_status, ledger_tx_hash,
               ledger_block_number, ledger_pushed_at, revision, updated_at
        FROM daily_insights
        WHERE date = ?
        "#,
    )
    .bind(date.format(DATE_FORMAT).to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let ledger_status: String = row.get("ledger_status");
    let ledger_status = LedgerStatus::parse(&ledger_status)
        .ok_or_else(|| Error::Internal(format!("Unknown ledger status '{}'", ledger_status)))?;

    Ok(Some(DailyInsight {
        id: row.get("id"),
        date,
        total_readings: row.get("total_readings"),
        recommended_crop: row.get("recommended_crop"),
        crop_confidence: row.get("crop_confidence"),
        soil_health_score: row.get("soil_health_score"),
        soil_health_rating: row.get("soil_health_rating"),
        has_anomaly: row.get::<i64, _>("has_anomaly") != 0,
        summary_status: row.get("summary_status"),
        summary_text: row.get("summary_text"),
        ledger_status,
        ledger_tx_hash: row.get("ledger_tx_hash"),
        ledger_block_number: row.get("ledger_block_number"),
        ledger_pushed_at: row.get("ledger_pushed_at"),
        revision: row.get("revision"),
        updated_at: row.get("updated_at"),
    }))
}
