//! Telemetry reads
//!
//! `measured_at` is local wall-clock text, so one calendar day is a lexical
//! half-open range `[day 00:00:00, next day 00:00:00)`.

use agrotwin_common::time::{format_local, LOCAL_TIMESTAMP_FORMAT};
use agrotwin_common::{Error, Result, SoilFeatures, SoilReading};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Row, SqlitePool};

fn day_bounds(date: NaiveDate) -> Result<(String, String)> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::InvalidInput(format!("Invalid date: {}", date)))?;
    let next = date
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::InvalidInput(format!("Date out of range: {}", date)))?;
    Ok((format_local(&start), format_local(&next)))
}

/// All readings taken on the local calendar date, oldest first
pub async fn fetch_readings_for_date(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<SoilReading>> {
    let (start, end) = day_bounds(date)?;

    let rows = sqlx::query(
        r#"
        SELECT id, measured_at, soil_temperature, soil_moisture, conductivity, ph,
               nitrogen, phosphorus, potassium, salt, air_temperature, air_humidity,
               is_raining
        FROM sensor_readings
        WHERE measured_at >= ? AND measured_at < ?
        ORDER BY measured_at
        "#,
    )
    .bind(&start)
    .bind(&end)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let measured_at: String = row.get("measured_at");
            let measured_at = NaiveDateTime::parse_from_str(&measured_at, LOCAL_TIMESTAMP_FORMAT)
                .map_err(|e| Error::Internal(format!("Failed to parse measured_at '{}': {}", measured_at, e)))?;

            Ok(SoilReading {
                id: row.get("id"),
                measured_at,
                features: SoilFeatures {
                    soil_temperature: row.get("soil_temperature"),
                    soil_moisture: row.get("soil_moisture"),
                    conductivity: row.get("conductivity"),
                    ph: row.get("ph"),
                    nitrogen: row.get("nitrogen"),
                    phosphorus: row.get("phosphorus"),
                    potassium: row.get("potassium"),
                    salt: row.get("salt"),
                    air_temperature: row.get("air_temperature"),
                    air_humidity: row.get("air_humidity"),
                    is_raining: row.get::<i64, _>("is_raining") != 0,
                },
            })
        })
        .collect()
}

/// Number of readings taken on the local calendar date
pub async fn count_readings_for_date(pool: &SqlitePool, date: NaiveDate) -> Result<i64> {
    let (start, end) = day_bounds(date)?;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sensor_readings WHERE measured_at >= ? AND measured_at < ?",
    )
    .bind(&start)
    .bind(&end)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Store one reading
///
/// Production telemetry is written by the ingestion service; this exists
/// for that collaborator's contract and for seeding test databases.
pub async fn insert_reading(
    pool: &SqlitePool,
    measured_at: &NaiveDateTime,
    features: &SoilFeatures,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO sensor_readings (
            measured_at, soil_temperature, soil_moisture, conductivity, ph,
            nitrogen, phosphorus, potassium, salt, air_temperature, air_humidity,
            is_raining
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(format_local(measured_at))
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
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
