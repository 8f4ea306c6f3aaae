use super::AppState;
use crate::error::ScoreError;
use crate::scoring::BatchStatistics;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{error, info, info_span};
use uuid::Uuid;

const ENDPOINTS: [&str; 7] = [
    "GET /health - health check",
    "POST /predict - score one session",
    "POST /predict_batch - score a list of sessions",
    "GET /model_info - loaded model summary",
    "GET /example - example request body",
    "GET /features - model feature names by category",
    "GET /stats - service statistics",
];

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"error": message.into(), "status": "error"})),
    )
        .into_response()
}

fn elapsed_secs(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0
}

fn is_empty_body(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Example feature map for `/predict`.
pub fn example_features() -> Value {
    json!({
        "visit_number": 1,
        "total_hits": 5,
        "unique_pages": 3,
        "session_duration": 120,
        "visit_hour": 14,
        "visit_weekday": 2,
        "is_weekend": 0,
        "is_mobile": 1,
        "is_android": 0,
        "is_ios": 1,
        "is_desktop": 0,
        "is_tablet": 0,
        "is_moscow": 1,
        "is_paid": 1,
        "avg_time_per_page": 24.0,
        "bounce_rate": 0,
        "deep_engagement": 0,
        "long_session": 0
    })
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.scorer.is_loaded(),
        "timestamp": Utc::now().timestamp_millis() as f64 / 1000.0,
    }))
}

pub async fn predict(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let _span = info_span!("predict", %request_id).entered();

    if !state.scorer.is_loaded() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "model is not loaded");
    }
    if is_empty_body(&body) {
        return error_response(StatusCode::BAD_REQUEST, "no data provided");
    }

    let result = match state.scorer.score(&body) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "prediction failed");
            let status = match &e {
                ScoreError::MalformedInput(_) | ScoreError::InvalidFeature { .. } => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return (
                status,
                Json(json!({
                    "error": e.to_string(),
                    "execution_time": elapsed_secs(start),
                    "status": "error",
                })),
            )
                .into_response();
        }
    };

    let mut out = match serde_json::to_value(&result) {
        Ok(Value::Object(m)) => m,
        _ => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode result"),
    };
    let execution_time = elapsed_secs(start);
    out.insert("execution_time".into(), json!(execution_time));
    out.insert("status".into(), json!("success"));
    info!(
        probability = result.probability,
        confidence = ?result.confidence_level,
        execution_time,
        "prediction served"
    );
    Json(Value::Object(out)).into_response()
}

pub async fn predict_batch(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let _span = info_span!("predict_batch", %request_id).entered();

    if !state.scorer.is_loaded() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "model is not loaded");
    }
    let Some(sessions) = body.get("sessions") else {
        return error_response(StatusCode::BAD_REQUEST, "no session data provided");
    };
    let Some(sessions) = sessions.as_array() else {
        return error_response(StatusCode::BAD_REQUEST, "sessions must be a list");
    };
    if sessions.len() > state.max_batch_size {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("maximum number of sessions: {}", state.max_batch_size),
        );
    }

    let results = state.scorer.score_batch(sessions);
    let statistics = BatchStatistics::from_results(&results);
    let execution_time = elapsed_secs(start);

    let mut out = json!({
        "predictions": results,
        "total_sessions": sessions.len(),
        "execution_time": execution_time,
        "status": "success",
    });
    if let (Some(stats), Some(map)) = (statistics, out.as_object_mut()) {
        map.insert("statistics".into(), json!(stats));
    }
    info!(
        sessions = sessions.len(),
        execution_time,
        "batch prediction served"
    );
    Json(out).into_response()
}

pub async fn model_info(State(state): State<AppState>) -> Response {
    let Some(model) = state.scorer.model() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "model is not loaded");
    };
    let names = &model.feature_names;
    let actions = model.target_actions.actions();
    Json(json!({
        "feature_count": names.len(),
        "target_actions_count": actions.len(),
        "feature_names": &names[..names.len().min(10)],
        "target_actions": &actions[..actions.len().min(5)],
        "city_count": model.cities.len(),
        "status": "loaded",
    }))
    .into_response()
}

pub async fn example() -> Json<Value> {
    Json(json!({
        "example_data": example_features(),
        "description": "Example feature map for a conversion prediction",
    }))
}

fn matching<'a>(names: &'a [String], needles: &[&str]) -> Vec<&'a str> {
    names
        .iter()
        .filter(|n| needles.iter().any(|k| n.contains(k)))
        .map(String::as_str)
        .collect()
}

pub async fn features(State(state): State<AppState>) -> Response {
    let Some(model) = state.scorer.model() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "model is not loaded");
    };
    let names = &model.feature_names;
    Json(json!({
        "features": names,
        "feature_count": names.len(),
        "feature_categories": {
            "temporal": matching(names, &["hour", "week", "morning", "afternoon", "evening", "night"]),
            "device": matching(names, &["mobile", "android", "ios", "desktop", "tablet", "windows", "macos"]),
            "geographic": matching(names, &["moscow", "spb", "city", "regional"]),
            "behavioral": matching(names, &["hits", "pages", "duration", "engagement", "activity"]),
            "traffic": matching(names, &["paid", "organic", "referral", "direct"]),
        },
    }))
    .into_response()
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "uptime_secs": state.started_at.elapsed().as_secs_f64(),
        "model_loaded": state.scorer.is_loaded(),
        "max_batch_size": state.max_batch_size,
        "endpoints": ENDPOINTS,
    }))
}
