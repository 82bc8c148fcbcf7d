//! Daily aggregate and persisted insight types

use agrotwin_common::SoilFeatures;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::analysis::AnalysisResult;

/// Min/max context for the noisiest agronomic signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeContext {
    pub min_soil_temp: f64,
    pub max_soil_temp: f64,
    pub min_moisture: f64,
    pub max_moisture: f64,
}

/// Statistical summary of one local day of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub sample_count: i64,
    /// Means, medians (conductivity, salt) and rain majority vote
    pub features: SoilFeatures,
    pub metadata: RangeContext,
}

/// Headline status stored with each insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryStatus {
    Alert,
    Excellent,
    Good,
    NeedsAttention,
}

impl SummaryStatus {
    /// Anomaly first, then soil-health score at 80 / 60
    pub fn derive(result: &AnalysisResult) -> Self {
        let score = result.soil_health.overall_score;
        if result.anomaly_detection.is_anomaly {
            SummaryStatus::Alert
        } else if score >= 80.0 {
            SummaryStatus::Excellent
        } else if score >= 60.0 {
            SummaryStatus::Good
        } else {
            SummaryStatus::NeedsAttention
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Alert => "ALERT",
            SummaryStatus::Excellent => "EXCELLENT",
            SummaryStatus::Good => "GOOD",
            SummaryStatus::NeedsAttention => "NEEDS_ATTENTION",
        }
    }
}

/// Ledger publication state, tracked independently of persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Pending,
    Confirmed,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Confirmed => "confirmed",
            LedgerStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(LedgerStatus::Pending),
            "confirmed" => Some(LedgerStatus::Confirmed),
            "failed" => Some(LedgerStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted daily insight (headline columns)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyInsight {
    pub id: i64,
    pub date: NaiveDate,
    pub total_readings: i64,
    pub recommended_crop: String,
    pub crop_confidence: f64,
    pub soil_health_score: f64,
    pub soil_health_rating: String,
    pub has_anomaly: bool,
    pub summary_status: String,
    pub summary_text: String,
    pub ledger_status: LedgerStatus,
    pub ledger_tx_hash: Option<String>,
    pub ledger_block_number: Option<i64>,
    pub ledger_pushed_at: Option<String>,
    /// Bumped by every upsert of the date
    pub revision: i64,
    pub updated_at: String,
}

/// Identity of one write of a daily insight
///
/// A ledger outcome is only recorded against the revision it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedInsight {
    pub id: i64,
    pub revision: i64,
}

/// Response of `POST /api/ai/analyze-daily`
#[derive(Debug, Clone, Serialize)]
pub struct DailyAnalysisReport {
    pub date: NaiveDate,
    pub aggregated_data: DailyAggregate,
    pub ai_analysis: AnalysisResult,
    pub saved_to_db: bool,
    pub record_id: i64,
}
