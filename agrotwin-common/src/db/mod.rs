//! Database module for AgroTwin
//!
//! Shared SQLite schema and telemetry model types.

pub mod init;
pub mod models;

pub use init::init_database;
pub use models::{SoilFeatures, SoilReading};
