//! Daily pipeline integration tests: aggregate → analyze → persist → ledger

mod helpers;

use agrotwin_ai::db::fetch_insight_by_date;
use agrotwin_ai::models::LedgerStatus;
use agrotwin_ai::AnalysisError;
use helpers::{date, healthy_features, spawn_bridge, TestEnv, BLOCK_NUMBER, TX_HASH};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_rerun_same_day_updates_single_row() {
    let env = TestEnv::new(true).await;
    let day = date("2025-10-27");
    let service = env.daily_service(env.analyzer(), None);

    env.insert_readings(day, 3, &healthy_features()).await;
    let first = service.run(day).await.unwrap().report;

    let mut wetter = healthy_features();
    wetter.soil_moisture = 70.0;
    env.insert_readings(day, 2, &wetter).await;
    let second = service.run(day).await.unwrap().report;

    assert_eq!(first.record_id, second.record_id);
    assert_eq!(second.aggregated_data.sample_count, 5);
    assert!((second.aggregated_data.features.soil_moisture - 67.0).abs() < 1e-9);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_insights")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.total_readings, 5);
}

#[tokio::test]
async fn test_report_contents() {
    let env = TestEnv::new(true).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 4, &healthy_features()).await;

    let run = env.daily_service(env.analyzer(), None).run(day).await.unwrap();
    let report = run.report;

    assert!(report.saved_to_db);
    assert_eq!(report.date, day);
    assert_eq!(report.ai_analysis.crop_recommendation.best_crop, "coffee");
    assert_eq!(report.ai_analysis.recommendations.len(), 1);
    assert!(report.ai_analysis.crop_validation.is_none());

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.recommended_crop, "coffee");
    assert_eq!(insight.soil_health_rating, "GOOD");
    assert!(!insight.has_anomaly);
}

#[tokio::test]
async fn test_no_data_is_distinct_outcome() {
    let env = TestEnv::new(true).await;
    let day = date("2025-10-28");
    env.insert_readings(date("2025-10-27"), 2, &healthy_features()).await;

    let result = env.daily_service(env.analyzer(), None).run(day).await;

    assert!(matches!(result, Err(AnalysisError::NoData(d)) if d == day));
    assert!(fetch_insight_by_date(&env.pool, day).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ledger_disabled_leaves_pending() {
    let env = TestEnv::new(true).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 2, &healthy_features()).await;

    let run = env.daily_service(env.analyzer(), None).run(day).await.unwrap();
    assert!(run.ledger.is_none());

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.ledger_status, LedgerStatus::Pending);
    assert!(insight.ledger_tx_hash.is_none());
    assert!(insight.ledger_pushed_at.is_none());
}

#[tokio::test]
async fn test_ledger_confirmed() {
    let env = TestEnv::new(true).await;
    let bridge = spawn_bridge(Duration::ZERO).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 6, &healthy_features()).await;

    let publisher = env.publisher(&bridge.url, Duration::from_secs(5));
    let run = env
        .daily_service(env.analyzer(), Some(publisher))
        .run(day)
        .await
        .unwrap();

    let status = run.ledger.expect("publish spawned").await.unwrap();
    assert_eq!(status, LedgerStatus::Confirmed);

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.ledger_status, LedgerStatus::Confirmed);
    assert_eq!(insight.ledger_tx_hash.as_deref(), Some(TX_HASH));
    assert_eq!(insight.ledger_block_number, Some(BLOCK_NUMBER));
    assert!(insight.ledger_pushed_at.is_some());

    let received = bridge.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["date"], "2025-10-27");
    assert_eq!(received[0]["sampleCount"], 6);
    assert_eq!(received[0]["recommendedCrop"], "coffee");
    assert_eq!(received[0]["isAnomalyDetected"], false);
}

#[tokio::test]
async fn test_ledger_timeout_keeps_saved_row() {
    let env = TestEnv::new(true).await;
    let bridge = spawn_bridge(Duration::from_secs(5)).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 2, &healthy_features()).await;

    let publisher = env.publisher(&bridge.url, Duration::from_secs(1));
    let run = env
        .daily_service(env.analyzer(), Some(publisher))
        .run(day)
        .await
        .unwrap();

    // Saved before the publish resolved
    assert!(run.report.saved_to_db);
    let handle = run.ledger.expect("publish spawned");
    assert!(!handle.is_finished());
    let pending = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(pending.ledger_status, LedgerStatus::Pending);

    assert_eq!(handle.await.unwrap(), LedgerStatus::Failed);

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.ledger_status, LedgerStatus::Failed);
    assert!(insight.ledger_tx_hash.is_none());
    assert_eq!(insight.recommended_crop, "coffee");
}

#[tokio::test]
async fn test_unreachable_bridge_marks_failed() {
    let env = TestEnv::new(true).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 2, &healthy_features()).await;

    // Nothing listens on the discard port
    let publisher = env.publisher("http://127.0.0.1:9", Duration::from_secs(2));
    let run = env
        .daily_service(env.analyzer(), Some(publisher))
        .run(day)
        .await
        .unwrap();

    assert_eq!(run.ledger.unwrap().await.unwrap(), LedgerStatus::Failed);
    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.ledger_status, LedgerStatus::Failed);
}

#[tokio::test]
async fn test_rerun_resets_ledger_status() {
    let env = TestEnv::new(true).await;
    let bridge = spawn_bridge(Duration::ZERO).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 2, &healthy_features()).await;

    let publisher = env.publisher(&bridge.url, Duration::from_secs(5));
    let confirmed = env
        .daily_service(env.analyzer(), Some(publisher))
        .run(day)
        .await
        .unwrap();
    confirmed.ledger.unwrap().await.unwrap();

    env.insert_readings(day, 1, &healthy_features()).await;
    env.daily_service(env.analyzer(), None).run(day).await.unwrap();

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.ledger_status, LedgerStatus::Pending);
    assert!(insight.ledger_tx_hash.is_none());
    assert_eq!(insight.total_readings, 3);
}

#[tokio::test]
async fn test_late_publish_does_not_overwrite_newer_run() {
    let env = TestEnv::new(true).await;
    let slow_bridge = spawn_bridge(Duration::from_millis(800)).await;
    let day = date("2025-10-27");
    env.insert_readings(day, 3, &healthy_features()).await;

    let slow = env.publisher(&slow_bridge.url, Duration::from_secs(5));
    let first = env
        .daily_service(env.analyzer(), Some(Arc::clone(&slow)))
        .run(day)
        .await
        .unwrap();

    env.insert_readings(day, 2, &healthy_features()).await;
    let unreachable = env.publisher("http://127.0.0.1:9", Duration::from_secs(2));
    let second = env
        .daily_service(env.analyzer(), Some(unreachable))
        .run(day)
        .await
        .unwrap();

    assert_eq!(slow.in_flight(), 1);
    assert_eq!(second.ledger.unwrap().await.unwrap(), LedgerStatus::Failed);
    assert_eq!(first.ledger.unwrap().await.unwrap(), LedgerStatus::Confirmed);
    assert_eq!(slow_bridge.received.lock().unwrap().len(), 1);
    assert_eq!(slow.in_flight(), 0);

    let insight = fetch_insight_by_date(&env.pool, day).await.unwrap().unwrap();
    assert_eq!(insight.total_readings, 5);
    assert_eq!(insight.ledger_status, LedgerStatus::Failed);
    assert!(insight.ledger_tx_hash.is_none());
    assert!(insight.ledger_block_number.is_none());
}
