//! Telemetry model types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of model input features
pub const FEATURE_COUNT: usize = 11;

/// Canonical feature order shared by training and inference
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "soil_temperature",
    "soil_moisture",
    "conductivity",
    "ph",
    "nitrogen",
    "phosphorus",
    "potassium",
    "salt",
    "air_temperature",
    "air_humidity",
    "is_raining",
];

/// The 11 soil and air measurements of one sample (or one daily aggregate)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilFeatures {
    /// Soil temperature (°C)
    pub soil_temperature: f64,
    /// Soil moisture (%)
    pub soil_moisture: f64,
    /// Electrical conductivity (µS/cm)
    pub conductivity: f64,
    /// Soil pH
    pub ph: f64,
    /// Nitrogen (mg/kg)
    pub nitrogen: f64,
    /// Phosphorus (mg/kg)
    pub phosphorus: f64,
    /// Potassium (mg/kg)
    pub potassium: f64,
    /// Salinity (mg/L)
    pub salt: f64,
    /// Air temperature (°C)
    pub air_temperature: f64,
    /// Air humidity (%)
    pub air_humidity: f64,
    /// Rain sensor state
    pub is_raining: bool,
}

impl SoilFeatures {
    /// Values in canonical order, rain flag coerced to 0/1
    pub fn canonical_values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.soil_temperature,
            self.soil_moisture,
            self.conductivity,
            self.ph,
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.salt,
            self.air_temperature,
            self.air_humidity,
            if self.is_raining { 1.0 } else { 0.0 },
        ]
    }
}

/// One timestamped telemetry sample
///
/// Written by the ingestion service; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub id: i64,
    /// Local wall-clock measurement time
    pub measured_at: NaiveDateTime,
    #[serde(flatten)]
    pub features: SoilFeatures,
}
