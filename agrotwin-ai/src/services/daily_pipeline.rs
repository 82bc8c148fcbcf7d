//! Daily analysis service
//!
//! aggregate → analyze → persist → detached ledger publish. The publish is
//! spawned only after the upsert committed, so ledger latency never reaches
//! the caller and a ledger failure never touches the saved row's analysis.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::AnalysisError;
use crate::models::{DailyAnalysisReport, LedgerStatus};
use crate::services::daily_aggregator::{AggregateOutcome, DailyAggregator};
use crate::services::insight_persister::InsightPersister;
use crate::services::ledger_publisher::LedgerPublisher;
use crate::services::soil_analyzer::SoilAnalyzer;

/// Report plus the handle of the detached ledger publish, if one started
pub struct DailyRun {
    pub report: DailyAnalysisReport,
    pub ledger: Option<JoinHandle<LedgerStatus>>,
}

pub struct DailyAnalysisService {
    aggregator: DailyAggregator,
    analyzer: SoilAnalyzer,
    persister: InsightPersister,
    publisher: Option<Arc<LedgerPublisher>>,
}

impl DailyAnalysisService {
    /// `publisher` is `None` when ledger publishing is disabled; rows then
    /// stay `pending`
    pub fn new(
        aggregator: DailyAggregator,
        analyzer: SoilAnalyzer,
        persister: InsightPersister,
        publisher: Option<Arc<LedgerPublisher>>,
    ) -> Self {
        Self {
            aggregator,
            analyzer,
            persister,
            publisher,
        }
    }

    pub fn publisher(&self) -> Option<&Arc<LedgerPublisher>> {
        self.publisher.as_ref()
    }

    /// Analyze one local calendar day
    ///
    /// Daily reports always run in discovery mode.
    pub async fn run(&self, date: NaiveDate) -> Result<DailyRun, AnalysisError> {
        let started = Instant::now();
        info!(date = %date, "Starting daily analysis");

        let aggregate = match self.aggregator.aggregate(date).await? {
            AggregateOutcome::Aggregated(aggregate) => aggregate,
            AggregateOutcome::NoData => return Err(AnalysisError::NoData(date)),
        };

        let analysis = self.analyzer.analyze_aggregate(&aggregate.features).await?;
        let saved = self.persister.upsert(&aggregate, &analysis).await?;
        let record_id = saved.id;

        let ledger = self.publisher.as_ref().map(|publisher| {
            publisher.spawn_publish(saved, date, analysis.clone(), aggregate.sample_count)
        });

        info!(
            date = %date,
            insight_id = record_id,
            samples = aggregate.sample_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Daily analysis saved"
        );

        Ok(DailyRun {
            report: DailyAnalysisReport {
                date,
                aggregated_data: aggregate,
                ai_analysis: analysis,
                saved_to_db: true,
                record_id,
            },
            ledger,
        })
    }
}
