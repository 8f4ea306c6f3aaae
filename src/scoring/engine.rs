//! Scorer over an injected, read-only trained model. Without a model every call fails with
//! [`ScoreError::ModelNotLoaded`]; the caller decides whether to load and retry.

use super::{BatchResult, ScoreResult};
use crate::config::ScoringConfig;
use crate::data::{aggregate_hits, Hit, Session};
use crate::error::ScoreError;
use crate::features::FeatureDeriver;
use crate::model::{Classifier, RandomForest, TrainedModel};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub struct Scorer<C = RandomForest> {
    model: Option<Arc<TrainedModel<C>>>,
    config: ScoringConfig,
}

/// Value of one schema feature: absent or null → 0, bool → 0/1, numeric string parsed.
fn feature_value(name: &str, v: Option<&Value>) -> Result<f64, ScoreError> {
    let invalid = |reason: String| ScoreError::InvalidFeature {
        name: name.to_string(),
        reason,
    };
    match v {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable as f64", n))),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(x),
            _ => Err(invalid(format!("{:?} is not a number", s))),
        },
        Some(other) => Err(invalid(format!("expected a number, got {}", other))),
    }
}

impl<C: Classifier> Scorer<C> {
    pub fn new(model: Option<Arc<TrainedModel<C>>>, config: ScoringConfig) -> Self {
        Self { model, config }
    }

    pub fn unloaded(config: ScoringConfig) -> Self {
        Self::new(None, config)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&TrainedModel<C>> {
        self.model.as_deref()
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Reindex `features` to the model's column order and score it.
    /// Unknown keys are ignored whatever their type.
    pub fn score(&self, features: &Value) -> Result<ScoreResult, ScoreError> {
        let model = self.model.as_deref().ok_or(ScoreError::ModelNotLoaded)?;
        let map = features.as_object().ok_or_else(|| {
            ScoreError::MalformedInput("expected a JSON object of features".to_string())
        })?;
        let row = Self::reindex(model, map)?;

        let probability = model.classifier.predict_proba(&row);
        let prediction = model.classifier.predict(&row);
        Ok(ScoreResult::new(prediction, probability, &self.config))
    }

    fn reindex(model: &TrainedModel<C>, map: &Map<String, Value>) -> Result<Vec<f64>, ScoreError> {
        model
            .feature_names
            .iter()
            .map(|name| feature_value(name, map.get(name)))
            .collect()
    }

    /// Score each input independently. One result per input, in input order.
    pub fn score_batch(&self, inputs: &[Value]) -> Vec<BatchResult> {
        inputs
            .iter()
            .enumerate()
            .map(|(i, input)| match self.score(input) {
                Ok(r) => BatchResult::scored(i, r),
                Err(e) => {
                    debug!(session_id = i, error = %e, "batch item failed");
                    BatchResult::failed(i, e.to_string())
                }
            })
            .collect()
    }

    /// Derive features from a raw session through the model's frozen city table, then score.
    /// Hits belonging to other sessions are ignored.
    pub fn score_session(&self, session: &Session, hits: &[Hit]) -> Result<ScoreResult, ScoreError> {
        let model = self.model.as_deref().ok_or(ScoreError::ModelNotLoaded)?;
        let aggregates = aggregate_hits(hits);
        let features =
            FeatureDeriver::new(&model.cities).derive(session, aggregates.get(&session.session_id))?;
        self.score(&Value::Object(features.to_map()))
    }
}
