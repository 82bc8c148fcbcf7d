//! Analysis result types
//!
//! [`AnalysisResult`] is the unit returned by the analyze endpoint and
//! persisted with each daily insight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower bound (inclusive) of the EXCELLENT band
pub const EXCELLENT_THRESHOLD: f64 = 85.0;
/// Lower bound (inclusive) of the GOOD band
pub const GOOD_THRESHOLD: f64 = 70.0;
/// Lower bound (inclusive) of the FAIR band
pub const FAIR_THRESHOLD: f64 = 55.0;

/// Clip a regressor output into the 0-100 score range
pub fn clip_score(raw: f64) -> f64 {
    raw.clamp(0.0, 100.0)
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Analysis mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Recommendation, health and anomaly checks only
    Discovery,
    /// Additionally score a caller-selected crop
    Validation,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Discovery => "discovery",
            AnalysisMode::Validation => "validation",
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(AnalysisMode::Discovery),
            "validation" => Ok(AnalysisMode::Validation),
            other => Err(format!(
                "mode must be \"discovery\" or \"validation\", got \"{}\"",
                other
            )),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality band for soil-health and suitability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthRating {
    /// Band for a clipped score; each band includes its lower bound
    pub fn from_score(score: f64) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            HealthRating::Excellent
        } else if score >= GOOD_THRESHOLD {
            HealthRating::Good
        } else if score >= FAIR_THRESHOLD {
            HealthRating::Fair
        } else {
            HealthRating::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthRating::Excellent => "EXCELLENT",
            HealthRating::Good => "GOOD",
            HealthRating::Fair => "FAIR",
            HealthRating::Poor => "POOR",
        }
    }
}

impl fmt::Display for HealthRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked crop candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProbability {
    pub crop: String,
    pub probability: f64,
}

/// Crop classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecommendation {
    pub best_crop: String,
    /// Probability of `best_crop`, in [0, 1]
    pub confidence: f64,
    /// Highest probabilities, descending
    pub top_3: Vec<CropProbability>,
}

/// Soil-health scorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilHealthAssessment {
    pub overall_score: f64,
    pub rating: HealthRating,
}

impl SoilHealthAssessment {
    /// Clip, rate on the unrounded score, then round for presentation
    pub fn from_raw(raw: f64) -> Self {
        let score = clip_score(raw);
        Self {
            rating: HealthRating::from_score(score),
            overall_score: round_to(score, 2),
        }
    }
}

/// Per-crop suitability check (validation mode only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropValidation {
    pub crop: String,
    pub suitability_score: f64,
    pub verdict: HealthRating,
}

impl CropValidation {
    pub fn from_raw(crop: impl Into<String>, raw: f64) -> Self {
        let score = clip_score(raw);
        Self {
            crop: crop.into(),
            verdict: HealthRating::from_score(score),
            suitability_score: round_to(score, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyStatus {
    Normal,
    Anomaly,
}

/// Anomaly detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAssessment {
    pub is_anomaly: bool,
    /// Model-native decision score; lower is more anomalous
    pub anomaly_score: f64,
    pub status: AnomalyStatus,
}

impl AnomalyAssessment {
    pub fn new(is_anomaly: bool, score: f64) -> Self {
        Self {
            is_anomaly,
            anomaly_score: round_to(score, 6),
            status: if is_anomaly {
                AnomalyStatus::Anomaly
            } else {
                AnomalyStatus::Normal
            },
        }
    }
}

/// Advisory urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One actionable advisory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,
}

/// Complete analysis of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mode: AnalysisMode,
    pub crop_recommendation: CropRecommendation,
    pub soil_health: SoilHealthAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_validation: Option<CropValidation>,
    pub anomaly_detection: AnomalyAssessment,
    /// Evaluation order, most domain-urgent first; never empty
    pub recommendations: Vec<Recommendation>,
    /// ISO-8601 with offset
    pub timestamp: String,
    pub processing_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_boundaries() {
        assert_eq!(HealthRating::from_score(85.0), HealthRating::Excellent);
        assert_eq!(HealthRating::from_score(84.999), HealthRating::Good);
        assert_eq!(HealthRating::from_score(70.0), HealthRating::Good);
        assert_eq!(HealthRating::from_score(69.999), HealthRating::Fair);
        assert_eq!(HealthRating::from_score(55.0), HealthRating::Fair);
        assert_eq!(HealthRating::from_score(54.999), HealthRating::Poor);
        assert_eq!(HealthRating::from_score(0.0), HealthRating::Poor);
        assert_eq!(HealthRating::from_score(100.0), HealthRating::Excellent);
    }

    #[test]
    fn test_rating_uses_unrounded_score() {
        // 84.999 rounds to 85.0 for display but stays GOOD
        let assessment = SoilHealthAssessment::from_raw(84.999);
        assert_eq!(assessment.rating, HealthRating::Good);
        assert_eq!(assessment.overall_score, 85.0);
    }

    #[test]
    fn test_scores_are_clipped() {
        let high = SoilHealthAssessment::from_raw(137.4);
        assert_eq!(high.overall_score, 100.0);
        assert_eq!(high.rating, HealthRating::Excellent);

        let low = CropValidation::from_raw("rice", -12.0);
        assert_eq!(low.suitability_score, 0.0);
        assert_eq!(low.verdict, HealthRating::Poor);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("discovery".parse::<AnalysisMode>().unwrap(), AnalysisMode::Discovery);
        assert_eq!("validation".parse::<AnalysisMode>().unwrap(), AnalysisMode::Validation);
        assert!("Discovery".parse::<AnalysisMode>().is_err());
        assert!("".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_anomaly_status_follows_flag() {
        let normal = AnomalyAssessment::new(false, -0.02341234);
        assert_eq!(normal.status, AnomalyStatus::Normal);
        assert_eq!(normal.anomaly_score, -0.023412);

        let anomaly = AnomalyAssessment::new(true, -3.5);
        assert_eq!(anomaly.status, AnomalyStatus::Anomaly);
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(Recommendation {
            priority: Priority::Critical,
            message: "x".into(),
        })
        .unwrap();
        assert_eq!(value["priority"], "CRITICAL");

        let rating = serde_json::to_value(HealthRating::Excellent).unwrap();
        assert_eq!(rating, "EXCELLENT");
    }
}
