//! Database access for agrotwin-ai
//!
//! Telemetry is read from `sensor_readings`; analysis results are written to
//! `daily_insights`. Tables are created by `agrotwin_common::db::init`.

pub mod insights;
pub mod readings;

pub use insights::{
    fetch_insight_by_date, fetch_unconfirmed_insights, update_ledger_status, upsert_insight,
    NewInsight, UnconfirmedInsight,
};
pub use readings::{count_readings_for_date, fetch_readings_for_date, insert_reading};
