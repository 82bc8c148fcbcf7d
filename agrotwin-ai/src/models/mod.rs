//! Data models for agrotwin-ai

pub mod analysis;
pub mod input;
pub mod insight;

pub use analysis::{
    AnalysisMode, AnalysisResult, AnomalyAssessment, AnomalyStatus, CropProbability,
    CropRecommendation, CropValidation, HealthRating, Priority, Recommendation,
    SoilHealthAssessment,
};
pub use input::SoilDataInput;
pub use insight::{
    DailyAggregate, DailyAnalysisReport, DailyInsight, LedgerStatus, RangeContext, SavedInsight,
    SummaryStatus,
};
