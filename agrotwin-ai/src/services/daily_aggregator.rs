//! Daily aggregator
//!
//! Collapses one local day of telemetry into a single feature set: means for
//! the stable sensors, medians for conductivity and salt, a strict majority
//! vote for rain, plus min/max context for temperature and moisture.

use agrotwin_common::{SoilFeatures, SoilReading};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};

use crate::db;
use crate::error::AnalysisError;
use crate::models::{DailyAggregate, RangeContext};

/// Aggregation result; an empty day is an outcome, not an error
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome {
    Aggregated(DailyAggregate),
    NoData,
}

pub struct DailyAggregator {
    pool: SqlitePool,
    timeout: Duration,
}

impl DailyAggregator {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Aggregate every reading taken on `date`
    pub async fn aggregate(&self, date: NaiveDate) -> Result<AggregateOutcome, AnalysisError> {
        info!(date = %date, "Aggregating sensor data");

        let readings = tokio::time::timeout(self.timeout, db::fetch_readings_for_date(&self.pool, date))
            .await
            .map_err(|_| {
                AnalysisError::Aggregation(format!(
                    "query for {} timed out after {}s",
                    date,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AnalysisError::Aggregation(e.to_string()))?;

        match summarize(date, &readings) {
            Some(aggregate) => {
                info!(date = %date, samples = aggregate.sample_count, "Aggregated sensor data");
                Ok(AggregateOutcome::Aggregated(aggregate))
            }
            None => {
                warn!(date = %date, "No sensor data found");
                Ok(AggregateOutcome::NoData)
            }
        }
    }
}

/// Pure aggregation over already-fetched readings; `None` when empty
pub fn summarize(date: NaiveDate, readings: &[SoilReading]) -> Option<DailyAggregate> {
    if readings.is_empty() {
        return None;
    }

    let soil_temperature = column(readings, |f| f.soil_temperature);
    let soil_moisture = column(readings, |f| f.soil_moisture);
    let raining = readings.iter().filter(|r| r.features.is_raining).count();

    Some(DailyAggregate {
        date,
        sample_count: readings.len() as i64,
        features: SoilFeatures {
            soil_temperature: mean(&soil_temperature),
            soil_moisture: mean(&soil_moisture),
            conductivity: median(column(readings, |f| f.conductivity)),
            ph: mean(&column(readings, |f| f.ph)),
            nitrogen: mean(&column(readings, |f| f.nitrogen)),
            phosphorus: mean(&column(readings, |f| f.phosphorus)),
            potassium: mean(&column(readings, |f| f.potassium)),
            salt: median(column(readings, |f| f.salt)),
            air_temperature: mean(&column(readings, |f| f.air_temperature)),
            air_humidity: mean(&column(readings, |f| f.air_humidity)),
            is_raining: raining * 2 > readings.len(),
        },
        metadata: RangeContext {
            min_soil_temp: min(&soil_temperature),
            max_soil_temp: max(&soil_temperature),
            min_moisture: min(&soil_moisture),
            max_moisture: max(&soil_moisture),
        },
    })
}

fn column(readings: &[SoilReading], field: impl Fn(&SoilFeatures) -> f64) -> Vec<f64> {
    readings.iter().map(|r| field(&r.features)).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; even-length input averages the two middle values
fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
