//! # AgroTwin Common Library
//!
//! Shared code for the AgroTwin services including:
//! - Database initialization and schema
//! - Telemetry model types (soil readings and their 11 features)
//! - Configuration loading and root folder resolution
//! - Time utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use db::models::{SoilFeatures, SoilReading, FEATURE_COUNT, FEATURE_NAMES};
pub use error::{Error, Result};
