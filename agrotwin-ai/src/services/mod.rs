//! Analysis services
//!
//! Per-request path: [`soil_analyzer`] → [`preprocessor`] → [`inference`] →
//! [`recommendations`]. Daily path: [`daily_aggregator`] → soil analyzer →
//! [`insight_persister`] → [`ledger_publisher`], wired by [`daily_pipeline`]
//! and scheduled by [`auto_analyzer`].

pub mod auto_analyzer;
pub mod daily_aggregator;
pub mod daily_pipeline;
pub mod inference;
pub mod insight_persister;
pub mod ledger_publisher;
pub mod preprocessor;
pub mod recommendations;
pub mod soil_analyzer;

pub use auto_analyzer::AutoAnalyzer;
pub use daily_aggregator::{AggregateOutcome, DailyAggregator};
pub use daily_pipeline::{DailyAnalysisService, DailyRun};
pub use inference::{InferenceOutcome, InferencePipeline};
pub use insight_persister::InsightPersister;
pub use ledger_publisher::{LedgerError, LedgerPublisher};
pub use preprocessor::{FeaturePreprocessor, FeatureVector};
pub use recommendations::{RecommendationEngine, TemplateRenderer};
pub use soil_analyzer::SoilAnalyzer;
