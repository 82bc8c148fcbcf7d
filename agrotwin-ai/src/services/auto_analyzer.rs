//! Auto analyzer
//!
//! Background task that runs the daily analysis once at startup and then
//! every day at a fixed local wall-clock time. A day is (re)analyzed only
//! when it has no insight yet or more readings arrived since the last run.
//! Each pass first republishes recent insights the ledger never confirmed,
//! including rows left `pending` by a shutdown mid-publish.

use agrotwin_common::{Error, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::db;
use crate::error::AnalysisError;
use crate::services::daily_pipeline::DailyAnalysisService;

/// Unconfirmed insights republished per pass, newest first
const LEDGER_RETRY_LIMIT: i64 = 7;

/// What one scheduled check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Insight is current
    UpToDate,
    /// No readings for the day
    NoData,
    Analyzed { insight_id: i64 },
}

/// Parse `HH:MM` (24h, local)
pub fn parse_run_at(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| Error::Config(format!("Invalid scheduler.run_at '{}': {}", value, e)))
}

/// Time from `now` until the next `run_at`; a run time equal to `now`
/// schedules tomorrow
pub fn duration_until_next(now: NaiveDateTime, run_at: NaiveTime) -> Duration {
    let mut next = now.date().and_time(run_at);
    if next <= now {
        next += ChronoDuration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// A day needs (re)analysis when it was never analyzed or gained readings
pub fn is_stale(readings: i64, analyzed_readings: Option<i64>) -> bool {
    analyzed_readings.map_or(true, |analyzed| readings > analyzed)
}

pub struct AutoAnalyzer {
    pool: SqlitePool,
    service: Arc<DailyAnalysisService>,
    run_at: NaiveTime,
}

impl AutoAnalyzer {
    pub fn new(pool: SqlitePool, service: Arc<DailyAnalysisService>, run_at: NaiveTime) -> Self {
        Self {
            pool,
            service,
            run_at,
        }
    }

    pub async fn check(&self, date: NaiveDate) -> std::result::Result<CheckOutcome, AnalysisError> {
        let readings = db::count_readings_for_date(&self.pool, date)
            .await
            .map_err(|e| AnalysisError::Aggregation(e.to_string()))?;
        if readings == 0 {
            return Ok(CheckOutcome::NoData);
        }

        let analyzed = db::fetch_insight_by_date(&self.pool, date)
            .await
            .map_err(|e| AnalysisError::Aggregation(e.to_string()))?
            .map(|insight| insight.total_readings);
        if !is_stale(readings, analyzed) {
            return Ok(CheckOutcome::UpToDate);
        }

        match self.service.run(date).await {
            Ok(run) => Ok(CheckOutcome::Analyzed {
                insight_id: run.report.record_id,
            }),
            Err(AnalysisError::NoData(_)) => Ok(CheckOutcome::NoData),
            Err(e) => Err(e),
        }
    }

    /// Republish unconfirmed insights; returns how many the ledger confirmed
    pub async fn retry_ledger(&self) -> usize {
        match self.service.publisher() {
            Some(publisher) => {
                let confirmed = publisher.retry_unconfirmed(LEDGER_RETRY_LIMIT).await;
                if confirmed > 0 {
                    info!(confirmed, "Republished unconfirmed insights");
                }
                confirmed
            }
            None => 0,
        }
    }

    async fn tick(&self) {
        self.retry_ledger().await;
        self.check_today().await;
    }

    async fn check_today(&self) {
        let today = agrotwin_common::time::today();
        match self.check(today).await {
            Ok(CheckOutcome::Analyzed { insight_id }) => {
                info!(date = %today, insight_id, "Auto analysis complete")
            }
            Ok(CheckOutcome::UpToDate) => info!(date = %today, "Daily insight is up to date"),
            Ok(CheckOutcome::NoData) => info!(date = %today, "No sensor data yet"),
            Err(e) => error!(date = %today, "Auto analysis failed: {}", e),
        }
    }

    /// Start the schedule; runs until the runtime shuts down
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(run_at = %self.run_at.format("%H:%M"), "Auto analyzer started");
            self.tick().await;

            loop {
                let wait = duration_until_next(agrotwin_common::time::now().naive_local(), self.run_at);
                info!(next_run_in_secs = wait.as_secs(), "Next auto analysis scheduled");
                tokio::time::sleep(wait).await;
                self.tick().await;
            }
        })
    }
}
