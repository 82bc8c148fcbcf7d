//! HTTP API integration tests

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{analyze_body, date, healthy_features, TestEnv};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use agrotwin_ai::build_router;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_service_descriptor() {
    let env = TestEnv::new(true).await;
    let app = build_router(env.app_state(None));

    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "agrotwin-ai");
    assert!(body["endpoints"]["analyze"].is_string());
}

#[tokio::test]
async fn test_health_loads_models_lazily() {
    let env = TestEnv::new(true).await;
    let app = build_router(env.app_state(None));

    let (_, info) = send(&app, get("/api/ai/models/info")).await;
    assert_eq!(info["models_loaded"], false);

    let (status, body) = send(&app, get("/api/ai/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "agrotwin-ai");
    assert_eq!(body["models_loaded"], true);
    assert_eq!(body["validators_loaded"], 4);
    assert!(body.get("last_error").is_none());

    let (_, info) = send(&app, get("/api/ai/models/info")).await;
    assert_eq!(info["models_loaded"], true);
    assert_eq!(info["crop_validators_count"], 4);
    assert_eq!(info["available_crops"], json!(["coffee", "cotton", "maize", "rice"]));
}

#[tokio::test]
async fn test_health_reports_missing_artifacts() {
    let env = TestEnv::new(false).await;
    let app = build_router(env.app_state(None));

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["models_loaded"], false);
    assert!(body["last_error"].as_str().is_some());
}

#[tokio::test]
async fn test_health_recovers_once_artifacts_appear() {
    let env = TestEnv::new(false).await;
    let app = build_router(env.app_state(None));

    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["status"], "unhealthy");

    helpers::write_artifacts(&env.models_dir);
    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["status"], "healthy");
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_analyze_discovery() {
    let env = TestEnv::new(true).await;
    let app = build_router(env.app_state(None));

    let (status, body) = send(&app, post("/api/ai/analyze", &analyze_body(&healthy_features()))).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["mode"], "discovery");
    assert_eq!(body["crop_recommendation"]["best_crop"], "coffee");
    assert_eq!(body["crop_recommendation"]["top_3"].as_array().unwrap().len(), 3);
    assert_eq!(body["soil_health"]["overall_score"], 78.0);
    assert_eq!(body["soil_health"]["rating"], "GOOD");
    assert_eq!(body["anomaly_detection"]["status"], "NORMAL");
    assert!(body.get("crop_validation").is_none());

    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["priority"], "LOW");
}

#[tokio::test]
async fn test_analyze_validation_mode() {
    let env = TestEnv::new(true).await;
    let app = build_router(env.app_state(None));

    let mut request = analyze_body(&healthy_features());
    request["mode"] = json!("validation");
    request["selected_crop"] = json!("maize");

    let (status, body) = send(&app, post("/api/ai/analyze", &request)).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["crop_validation"]["crop"], "maize");
    assert_eq!(body["crop_validation"]["suitability_score"], 70.0);
}

#[tokio::test]
async fn test_analyze_rejects_bad_input() {
    let env = TestEnv::new(true).await;
    let app = build_router(env.app_state(None));

    let mut out_of_range = analyze_body(&healthy_features());
    out_of_range["ph"] = json!(15.0);
    let (status, body) = send(&app, post("/api/ai/analyze", &out_of_range)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let mut unknown_mode = analyze_body(&healthy_features());
    unknown_mode["mode"] = json!("forecast");
    let (status, _) = send(&app, post("/api/ai/analyze", &unknown_mode)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut unknown_crop = analyze_body(&healthy_features());
    unknown_crop["mode"] = json!("validation");
    unknown_crop["selected_crop"] = json!("banana");
    let (status, body) = send(&app, post("/api/ai/analyze", &unknown_crop)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("banana"));
}

#[tokio::test]
async fn test_analyze_without_models_is_unavailable() {
    let env = TestEnv::new(false).await;
    let app = build_router(env.app_state(None));

    let (status, body) = send(&app, post("/api/ai/analyze", &analyze_body(&healthy_features()))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "MODELS_UNAVAILABLE");
}

#[tokio::test]
async fn test_analyze_daily() {
    let env = TestEnv::new(true).await;
    env.insert_readings(date("2025-10-27"), 3, &healthy_features()).await;
    let app = build_router(env.app_state(None));

    let (status, body) = send(&app, post("/api/ai/analyze-daily", &json!({ "date": "2025-10-27" }))).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["date"], "2025-10-27");
    assert_eq!(body["saved_to_db"], true);
    assert_eq!(body["aggregated_data"]["sample_count"], 3);
    assert!(body["record_id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_analyze_daily_errors() {
    let env = TestEnv::new(true).await;
    let app = build_router(env.app_state(None));

    let (status, _) = send(&app, post("/api/ai/analyze-daily", &json!({ "date": "27/10/2025" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post("/api/ai/analyze-daily", &json!({ "date": "2025-10-28" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
