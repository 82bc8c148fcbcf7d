//! Inbound analyze contract

use agrotwin_common::SoilFeatures;
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisMode;
use crate::error::AnalysisError;

/// Accepted range (inclusive) for each numeric feature
pub const FIELD_RANGES: [(&str, f64, f64); 10] = [
    ("soil_temperature", -50.0, 100.0),
    ("soil_moisture", 0.0, 100.0),
    ("conductivity", 0.0, 5000.0),
    ("ph", 0.0, 14.0),
    ("nitrogen", 0.0, 500.0),
    ("phosphorus", 0.0, 500.0),
    ("potassium", 0.0, 500.0),
    ("salt", 0.0, 5000.0),
    ("air_temperature", -50.0, 100.0),
    ("air_humidity", 0.0, 100.0),
];

fn default_mode() -> String {
    AnalysisMode::Discovery.as_str().to_string()
}

/// Request body of `POST /api/ai/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilDataInput {
    #[serde(flatten)]
    pub features: SoilFeatures,
    /// `discovery` (default) or `validation`
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Crop to validate; required in validation mode
    #[serde(default)]
    pub selected_crop: Option<String>,
}

impl SoilDataInput {
    /// Check mode and field ranges; crop resolution happens against the registry
    pub fn validate(&self) -> Result<AnalysisMode, AnalysisError> {
        let mode: AnalysisMode = self.mode.parse().map_err(AnalysisError::Validation)?;
        validate_ranges(&self.features)?;

        if mode == AnalysisMode::Validation
            && self
                .selected_crop
                .as_deref()
                .map_or(true, |crop| crop.trim().is_empty())
        {
            return Err(AnalysisError::Validation(
                "selected_crop is required for validation mode".to_string(),
            ));
        }
        Ok(mode)
    }
}

/// Reject NaN and out-of-range values
pub fn validate_ranges(features: &SoilFeatures) -> Result<(), AnalysisError> {
    let values = features.canonical_values();
    for (i, (name, min, max)) in FIELD_RANGES.iter().enumerate() {
        let value = values[i];
        if !(*min..=*max).contains(&value) {
            return Err(AnalysisError::Validation(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
    }
    Ok(())
}
