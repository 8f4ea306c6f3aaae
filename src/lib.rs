//! Session conversion scoring for clickstream data.
//!
//! Modular structure:
//! - [`data`]: Session and hit records, JSON Lines ingest, per-session hit aggregation
//! - [`labels`]: Keyword-based target action labelling
//! - [`features`]: Deterministic session feature derivation and city tiering
//! - [`model`]: Random forest classifier, training pipeline, metrics, model bundle
//! - [`scoring`]: Single and batch scoring with confidence bands
//! - [`server`]: HTTP wrapper
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod labels;
pub mod logging;
pub mod model;
pub mod scoring;
pub mod server;

pub use config::AppConfig;
pub use data::{Hit, Session};
pub use error::{DataError, FeatureError, ModelError, ScoreError, TrainError};
pub use features::{Feature, FeatureDeriver, FeatureVector};
pub use labels::TargetActionSet;
pub use logging::StructuredLogger;
pub use model::{Classifier, RandomForest, TrainedModel};
pub use scoring::{BatchResult, ConfidenceLevel, ScoreResult, Scorer};
