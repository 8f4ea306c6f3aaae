//! HTTP wrapper: routes, status codes and response shapes.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use session_conversion::config::ScoringConfig;
use session_conversion::server::{router, AppState};
use session_conversion::Scorer;
use std::sync::Arc;
use tower::ServiceExt;

fn loaded_app(max_batch_size: usize) -> Router {
    let scorer = Scorer::new(
        Some(Arc::new(common::engagement_model())),
        ScoringConfig::default(),
    );
    router(AppState::new(Arc::new(scorer), max_batch_size))
}

fn unloaded_app() -> Router {
    let scorer = Scorer::unloaded(ScoringConfig::default());
    router(AppState::new(Arc::new(scorer), 10))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, req).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_model_state() {
    let (status, body) = get(loaded_app(10), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);

    let (status, body) = get(unloaded_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn predict_returns_scored_result() {
    let (status, body) = post(loaded_app(10), "/predict", common::high_engagement()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let p = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));
    assert!(body["prediction"].is_u64());
    assert!(body["will_convert"].is_boolean());
    assert!(body["conversion_probability"].as_str().unwrap().ends_with('%'));
    assert!(["low", "medium", "high"].contains(&body["confidence_level"].as_str().unwrap()));
    assert!(body["execution_time"].as_f64().is_some());
}

#[tokio::test]
async fn predict_rejects_empty_and_invalid_input() {
    let (status, body) = post(loaded_app(10), "/predict", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = post(loaded_app(10), "/predict", json!({"total_hits": "abc"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(loaded_app(10), "/predict", json!("total_hits")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unloaded_model_is_a_server_error() {
    let (status, body) = post(unloaded_app(), "/predict", common::high_engagement()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");

    let (status, _) = post(
        unloaded_app(),
        "/predict_batch",
        json!({"sessions": [common::high_engagement()]}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = get(unloaded_app(), "/model_info").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn batch_scores_in_order_with_statistics() {
    let sessions = json!({"sessions": [
        common::high_engagement(),
        "not an object",
        common::low_engagement(),
    ]});
    let (status, body) = post(loaded_app(10), "/predict_batch", sessions).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["total_sessions"], 3);

    let preds = body["predictions"].as_array().unwrap();
    assert_eq!(preds.len(), 3);
    for (i, p) in preds.iter().enumerate() {
        assert_eq!(p["session_id"], i);
    }
    assert!(preds[1]["error"].is_string());
    assert_eq!(preds[1]["probability"], 0.0);
    assert_eq!(preds[1]["conversion_probability"], "0.00%");
    assert!(preds[0].get("error").is_none());

    let stats = &body["statistics"];
    assert_eq!(stats["successful_predictions"], 2);
    assert_eq!(stats["failed_predictions"], 1);
}

#[tokio::test]
async fn batch_validates_shape_and_size() {
    let (status, _) = post(loaded_app(10), "/predict_batch", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(loaded_app(10), "/predict_batch", json!({"sessions": {"a": 1}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_many: Vec<Value> = (0..3).map(|_| common::low_engagement()).collect();
    let (status, body) = post(loaded_app(2), "/predict_batch", json!({"sessions": too_many})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains('2'));

    let (status, body) = post(loaded_app(2), "/predict_batch", json!({"sessions": []})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sessions"], 0);
    assert!(body.get("statistics").is_none());
}

#[tokio::test]
async fn introspection_endpoints() {
    let (status, body) = get(loaded_app(10), "/model_info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feature_count"], 46);
    assert_eq!(body["feature_names"].as_array().unwrap().len(), 10);
    assert_eq!(body["status"], "loaded");

    let (status, body) = get(loaded_app(10), "/features").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feature_count"], 46);
    let temporal = body["feature_categories"]["temporal"].as_array().unwrap();
    assert!(temporal.contains(&json!("visit_hour")));

    let (status, body) = get(loaded_app(10), "/example").await;
    assert_eq!(status, StatusCode::OK);
    let example = body["example_data"].clone();
    let (status, _) = post(loaded_app(10), "/predict", example).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(loaded_app(10), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"].as_array().unwrap().len(), 7);
}
