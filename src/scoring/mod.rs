//! Conversion scoring: feature map → prediction, probability and confidence band,
//! plus batch scoring with per-item failure isolation.

mod engine;

pub use engine::Scorer;

use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Strict comparisons: a probability equal to a threshold falls in the lower band.
    pub fn from_probability(p: f64, config: &ScoringConfig) -> Self {
        if p > config.high_threshold {
            ConfidenceLevel::High
        } else if p > config.medium_threshold {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

fn percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

/// Result for a single session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub prediction: u8,
    pub probability: f64,
    pub will_convert: bool,
    pub conversion_probability: String,
    pub confidence_level: ConfidenceLevel,
}

impl ScoreResult {
    pub fn new(prediction: u8, probability: f64, config: &ScoringConfig) -> Self {
        Self {
            prediction,
            probability,
            will_convert: prediction == 1,
            conversion_probability: percent(probability),
            confidence_level: ConfidenceLevel::from_probability(probability, config),
        }
    }
}

/// One entry of a batch response; `session_id` is the 0-based input position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub session_id: usize,
    pub prediction: u8,
    pub probability: f64,
    pub will_convert: bool,
    pub conversion_probability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn scored(session_id: usize, r: ScoreResult) -> Self {
        Self {
            session_id,
            prediction: r.prediction,
            probability: r.probability,
            will_convert: r.will_convert,
            conversion_probability: r.conversion_probability,
            confidence_level: Some(r.confidence_level),
            error: None,
        }
    }

    pub fn failed(session_id: usize, error: String) -> Self {
        Self {
            session_id,
            prediction: 0,
            probability: 0.0,
            will_convert: false,
            conversion_probability: percent(0.0),
            confidence_level: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary over the successful items of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub successful_predictions: usize,
    pub failed_predictions: usize,
    /// Mean probability in percent, 2 decimals
    pub average_probability: f64,
    pub high_confidence_predictions: usize,
    pub high_confidence_percentage: f64,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl BatchStatistics {
    /// `None` when no item was scored successfully.
    pub fn from_results(results: &[BatchResult]) -> Option<Self> {
        let ok: Vec<&BatchResult> = results.iter().filter(|r| !r.is_error()).collect();
        if ok.is_empty() {
            return None;
        }
        let n = ok.len() as f64;
        let avg = ok.iter().map(|r| r.probability).sum::<f64>() / n;
        let high = ok
            .iter()
            .filter(|r| r.confidence_level == Some(ConfidenceLevel::High))
            .count();
        Some(Self {
            successful_predictions: ok.len(),
            failed_predictions: results.len() - ok.len(),
            average_probability: round2(avg * 100.0),
            high_confidence_predictions: high,
            high_confidence_percentage: round2(high as f64 / n * 100.0),
        })
    }
}
