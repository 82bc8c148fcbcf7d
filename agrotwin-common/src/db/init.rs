//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the telemetry and
//! daily-insight tables. Every statement is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the aggregation scan run while the ledger write-back commits
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_sensor_readings_table(&pool).await?;
    create_daily_insights_table(&pool).await?;

    Ok(pool)
}

/// Telemetry table (owned by the ingestion service)
///
/// `measured_at` holds local wall-clock time as `YYYY-MM-DD HH:MM:SS` so that
/// lexical range scans select a local calendar day.
pub async fn create_sensor_readings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            measured_at TEXT NOT NULL,
            soil_temperature REAL NOT NULL,
            soil_moisture REAL NOT NULL,
            conductivity REAL NOT NULL,
            ph REAL NOT NULL,
            nitrogen REAL NOT NULL,
            phosphorus REAL NOT NULL,
            potassium REAL NOT NULL,
            salt REAL NOT NULL,
            air_temperature REAL NOT NULL,
            air_humidity REAL NOT NULL,
            is_raining INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sensor_readings_measured_at ON sensor_readings(measured_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Daily insight table, one row per local date
pub async fn create_daily_insights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_insights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL UNIQUE,
            total_readings INTEGER NOT NULL,
            soil_temperature_avg REAL NOT NULL,
            soil_moisture_avg REAL NOT NULL,
            conductivity_median REAL NOT NULL,
            ph_avg REAL NOT NULL,
            nitrogen_avg REAL NOT NULL,
            phosphorus_avg REAL NOT NULL,
            potassium_avg REAL NOT NULL,
            salt_median REAL NOT NULL,
            air_temperature_avg REAL NOT NULL,
            air_humidity_avg REAL NOT NULL,
            is_raining_majority INTEGER NOT NULL,
            soil_temperature_min REAL NOT NULL,
            soil_temperature_max REAL NOT NULL,
            soil_moisture_min REAL NOT NULL,
            soil_moisture_max REAL NOT NULL,
            recommended_crop TEXT NOT NULL,
            crop_confidence REAL NOT NULL,
            soil_health_score REAL NOT NULL,
            soil_health_rating TEXT NOT NULL,
            has_anomaly INTEGER NOT NULL,
            anomaly_score REAL NOT NULL,
            summary_status TEXT NOT NULL,
            summary_text TEXT NOT NULL,
            analysis_json TEXT NOT NULL,
            recommendations_json TEXT NOT NULL,
            ledger_status TEXT NOT NULL DEFAULT 'pending',
            ledger_tx_hash TEXT,
            ledger_block_number INTEGER,
            ledger_pushed_at TEXT,
            revision INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
