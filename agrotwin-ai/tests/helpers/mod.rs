//! Test helper utilities
//!
//! Fixture artifacts, temporary databases and a mock ledger bridge shared by
//! the agrotwin-ai integration tests.

#![allow(dead_code)]

use agrotwin_ai::registry::{ArtifactPaths, ModelRegistry};
use agrotwin_ai::services::{
    DailyAggregator, DailyAnalysisService, InsightPersister, LedgerPublisher,
    RecommendationEngine, SoilAnalyzer,
};
use agrotwin_ai::AppState;
use agrotwin_common::{SoilFeatures, FEATURE_COUNT};
use axum::{extract::State, routing::post, Json, Router};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const CROPS: [&str; 4] = ["coffee", "cotton", "maize", "rice"];
pub const TX_HASH: &str = "0x5f3c9a";
pub const BLOCK_NUMBER: i64 = 4242;

/// Write a consistent artifact set into `dir`: identity scaler, coffee
/// favoured, soil health 78, nothing anomalous
pub fn write_artifacts(dir: &Path) {
    let write = |path: PathBuf, value: Value| {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    };
    let paths = ArtifactPaths::in_dir(dir);
    let zeros = vec![0.0; FEATURE_COUNT];

    write(
        paths.scaler_path.clone(),
        json!({ "mean": zeros, "scale": vec![1.0; FEATURE_COUNT] }),
    );
    write(paths.encoder_path.clone(), json!({ "classes": CROPS }));
    write(
        paths.classifier(),
        json!({ "coefficients": vec![zeros.clone(); CROPS.len()], "intercepts": [3.0, 0.0, 0.5, 1.0] }),
    );
    write(
        paths.soil_health_scorer(),
        json!({ "coefficients": zeros, "intercept": 78.0 }),
    );
    write(
        paths.anomaly_detector(),
        json!({ "center": zeros, "spread": vec![10_000.0; FEATURE_COUNT], "threshold": -5.0 }),
    );
    write(paths.validator_manifest(), json!({ "crops": CROPS }));
    for (i, crop) in CROPS.iter().enumerate() {
        write(
            paths.validator(crop),
            json!({ "coefficients": zeros, "intercept": 90.0 - 10.0 * i as f64 }),
        );
    }
}

/// Coffee-friendly sample: every value inside the coffee bands
pub fn healthy_features() -> SoilFeatures {
    SoilFeatures {
        soil_temperature: 24.0,
        soil_moisture: 65.0,
        conductivity: 800.0,
        ph: 6.0,
        nitrogen: 50.0,
        phosphorus: 40.0,
        potassium: 250.0,
        salt: 400.0,
        air_temperature: 27.0,
        air_humidity: 70.0,
        is_raining: false,
    }
}

/// Request body for `POST /api/ai/analyze`
pub fn analyze_body(features: &SoilFeatures) -> Value {
    let mut body = serde_json::to_value(features).unwrap();
    body["mode"] = json!("discovery");
    body
}

/// Temporary root folder with a database and (optionally) model artifacts
pub struct TestEnv {
    pub temp: TempDir,
    pub pool: SqlitePool,
    pub models_dir: PathBuf,
}

impl TestEnv {
    pub async fn new(with_artifacts: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let pool = agrotwin_common::db::init_database(&temp.path().join("agrotwin.db"))
            .await
            .unwrap();
        let models_dir = temp.path().join("models");
        if with_artifacts {
            write_artifacts(&models_dir);
        }
        Self {
            temp,
            pool,
            models_dir,
        }
    }

    pub fn registry(&self) -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry::new(ArtifactPaths::in_dir(&self.models_dir)))
    }

    pub fn analyzer(&self) -> SoilAnalyzer {
        SoilAnalyzer::new(self.registry(), RecommendationEngine::default())
    }

    pub fn daily_service(
        &self,
        analyzer: SoilAnalyzer,
        publisher: Option<Arc<LedgerPublisher>>,
    ) -> Arc<DailyAnalysisService> {
        Arc::new(DailyAnalysisService::new(
            DailyAggregator::new(self.pool.clone(), Duration::from_secs(10)),
            analyzer,
            InsightPersister::new(self.pool.clone()),
            publisher,
        ))
    }

    pub fn app_state(&self, publisher: Option<Arc<LedgerPublisher>>) -> AppState {
        let analyzer = self.analyzer();
        let daily = self.daily_service(analyzer.clone(), publisher);
        AppState::new(analyzer, daily)
    }

    pub fn publisher(&self, bridge_url: &str, timeout: Duration) -> Arc<LedgerPublisher> {
        Arc::new(LedgerPublisher::new(self.pool.clone(), bridge_url, timeout).unwrap())
    }

    /// Insert `count` readings for `date`, ten minutes apart from 08:00
    pub async fn insert_readings(&self, date: NaiveDate, count: usize, features: &SoilFeatures) {
        let start = NaiveDateTime::new(date, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        for i in 0..count {
            let measured_at = start + chrono::Duration::minutes(10 * i as i64);
            agrotwin_ai::db::insert_reading(&self.pool, &measured_at, features)
                .await
                .unwrap();
        }
    }
}

/// Local stand-in for the ledger bridge
pub struct MockBridge {
    pub url: String,
    pub received: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct BridgeState {
    delay: Duration,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn push_daily_insight(
    State(state): State<BridgeState>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    state.received.lock().unwrap().push(payload);
    tokio::time::sleep(state.delay).await;
    Json(json!({ "txHash": TX_HASH, "blockNumber": BLOCK_NUMBER }))
}

/// Start a bridge that answers after `delay`
pub async fn spawn_bridge(delay: Duration) -> MockBridge {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/pushDailyInsight", post(push_daily_insight))
        .with_state(BridgeState {
            delay,
            received: Arc::clone(&received),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBridge {
        url: format!("http://{}", addr),
        received,
    }
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}
