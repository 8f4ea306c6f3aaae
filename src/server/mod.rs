//! HTTP wrapper around the scorer. Stateless apart from the shared, read-only model.

mod handlers;

pub use handlers::example_features;

use crate::scoring::Scorer;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<Scorer>,
    /// Batch requests above this size are rejected before scoring
    pub max_batch_size: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(scorer: Arc<Scorer>, max_batch_size: usize) -> Self {
        Self {
            scorer,
            max_batch_size,
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/predict_batch", post(handlers::predict_batch))
        .route("/model_info", get(handlers::model_info))
        .route("/example", get(handlers::example))
        .route("/features", get(handlers::features))
        .route("/stats", get(handlers::stats))
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn serve(state: AppState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(
        addr = %listener.local_addr()?,
        model_loaded = state.scorer.is_loaded(),
        "server listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
        })
        .await
}
