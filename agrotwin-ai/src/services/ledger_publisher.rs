//! Ledger publisher
//!
//! Posts a distilled daily insight to the ledger bridge and records the
//! outcome on the already-committed row. Publishing never fails the caller:
//! every error is logged and downgraded to a `failed` ledger status.
//! Outcomes are recorded against the row revision the payload was built
//! from, so a late publish never overwrites a newer write's ledger columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db;
use crate::models::{AnalysisResult, HealthRating, LedgerStatus, Recommendation, SavedInsight};

const PUSH_PATH: &str = "/api/pushDailyInsight";
const USER_AGENT: &str = concat!("agrotwin-ai/", env!("CARGO_PKG_VERSION"));

/// Ledger bridge errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger bridge timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Ledger bridge returned {0}: {1}")]
    Status(u16, String),

    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Body of `POST /api/pushDailyInsight`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPayload {
    pub date: String,
    pub sample_count: i64,
    pub recommended_crop: String,
    pub confidence: f64,
    pub soil_health_score: f64,
    pub health_rating: HealthRating,
    pub is_anomaly_detected: bool,
    pub recommendations: Vec<Recommendation>,
}

impl LedgerPayload {
    pub fn new(date: NaiveDate, analysis: &AnalysisResult, sample_count: i64) -> Self {
        Self {
            date: date.format(agrotwin_common::time::DATE_FORMAT).to_string(),
            sample_count,
            recommended_crop: analysis.crop_recommendation.best_crop.clone(),
            confidence: analysis.crop_recommendation.confidence,
            soil_health_score: analysis.soil_health.overall_score,
            health_rating: analysis.soil_health.rating,
            is_anomaly_detected: analysis.anomaly_detection.is_anomaly,
            recommendations: analysis.recommendations.clone(),
        }
    }
}

/// Bridge reply on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub tx_hash: String,
    #[serde(default)]
    pub block_number: Option<i64>,
}

pub struct LedgerPublisher {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    pool: SqlitePool,
    in_flight: Arc<AtomicUsize>,
}

/// Counts one detached publish until dropped
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LedgerPublisher {
    pub fn new(pool: SqlitePool, bridge_url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}{}", bridge_url.trim_end_matches('/'), PUSH_PATH),
            timeout,
            pool,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Detached publishes that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one payload to the bridge
    pub async fn push(&self, payload: &LedgerPayload) -> Result<LedgerReceipt, LedgerError> {
        debug!(endpoint = %self.endpoint, date = %payload.date, "Pushing insight to ledger");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Status(status.as_u16(), body));
        }

        let receipt: LedgerReceipt = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(e)
            } else {
                LedgerError::InvalidResponse(e.to_string())
            }
        })?;

        if receipt.tx_hash.trim().is_empty() {
            return Err(LedgerError::InvalidResponse("empty txHash".to_string()));
        }
        Ok(receipt)
    }

    fn classify(&self, err: reqwest::Error) -> LedgerError {
        if err.is_timeout() {
            LedgerError::Timeout(self.timeout.as_secs())
        } else {
            LedgerError::Network(err.to_string())
        }
    }

    /// Push and write the outcome back onto `saved`
    ///
    /// Returns the push outcome; never returns an error. When a later upsert
    /// superseded `saved`, the outcome is logged and not recorded.
    pub async fn publish(
        &self,
        saved: SavedInsight,
        date: NaiveDate,
        analysis: &AnalysisResult,
        sample_count: i64,
    ) -> LedgerStatus {
        let payload = LedgerPayload::new(date, analysis, sample_count);
        let insight_id = saved.id;

        let (status, tx_hash, block_number) = match self.push(&payload).await {
            Ok(receipt) => {
                info!(
                    date = %date,
                    insight_id,
                    tx_hash = %receipt.tx_hash,
                    block_number = ?receipt.block_number,
                    "Ledger push confirmed"
                );
                (LedgerStatus::Confirmed, Some(receipt.tx_hash), receipt.block_number)
            }
            Err(e) => {
                warn!(date = %date, insight_id, "Ledger push failed: {}", e);
                (LedgerStatus::Failed, None, None)
            }
        };

        match db::update_ledger_status(&self.pool, saved, status, tx_hash.as_deref(), block_number).await {
            Ok(true) => {}
            Ok(false) => info!(
                date = %date,
                insight_id,
                revision = saved.revision,
                "Insight rewritten during publish; ledger status {} not recorded",
                status
            ),
            Err(e) => error!(insight_id, "Failed to record ledger status {}: {}", status, e),
        }
        status
    }

    /// Publish on a detached task
    ///
    /// The caller's save is already committed; awaiting the handle is optional.
    pub fn spawn_publish(
        self: &Arc<Self>,
        saved: SavedInsight,
        date: NaiveDate,
        analysis: AnalysisResult,
        sample_count: i64,
    ) -> JoinHandle<LedgerStatus> {
        let publisher = Arc::clone(self);
        let guard = InFlight::start(&self.in_flight);
        tokio::spawn(async move {
            let _guard = guard;
            publisher.publish(saved, date, &analysis, sample_count).await
        })
    }

    /// Publish again every recent insight still `pending` or `failed`
    ///
    /// Skipped while detached publishes are running, since their rows are
    /// `pending` too. Returns the number of rows confirmed.
    pub async fn retry_unconfirmed(&self, limit: i64) -> usize {
        if self.in_flight() > 0 {
            debug!(in_flight = self.in_flight(), "Ledger retry skipped, publishes running");
            return 0;
        }

        let insights = match db::fetch_unconfirmed_insights(&self.pool, limit).await {
            Ok(insights) => insights,
            Err(e) => {
                error!("Failed to list unconfirmed insights: {}", e);
                return 0;
            }
        };

        let mut confirmed = 0;
        for insight in insights {
            info!(date = %insight.date, insight_id = insight.saved.id, "Retrying ledger publish");
            let status = self
                .publish(insight.saved, insight.date, &insight.analysis, insight.sample_count)
                .await;
            if status == LedgerStatus::Confirmed {
                confirmed += 1;
            }
        }
        confirmed
    }
}
