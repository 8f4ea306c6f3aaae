//! Application configuration. Every section has defaults so a missing file is not fatal.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Raw training inputs
    pub data: DataConfig,
    /// Serialized model bundle (written by `train`, read by `predict`/`serve`)
    pub model_path: PathBuf,
    /// Split, search grid and evaluation parameters
    pub training: TrainingConfig,
    /// Confidence banding thresholds
    pub scoring: ScoringConfig,
    /// HTTP wrapper
    pub server: ServerConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// JSON Lines file, one session per line
    pub sessions_path: PathBuf,
    /// JSON Lines file, one hit per line
    pub hits_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Holdout share for evaluation
    pub test_size: f64,
    pub seed: u64,
    /// Folds used by the grid search
    pub search_folds: usize,
    /// Folds used by the final cross-validation report (0 disables it)
    pub report_folds: usize,
    pub grid: ParamGrid,
}

/// Hyperparameter candidates; the search walks their cartesian product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Probability strictly above this is high confidence
    pub high_threshold: f64,
    /// Probability strictly above this is medium confidence
    pub medium_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Upper bound on `sessions` in one batch request
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            model_path: PathBuf::from("build/session_conversion_model.json"),
            training: TrainingConfig::default(),
            scoring: ScoringConfig::default(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sessions_path: PathBuf::from("data/ga_sessions.jsonl"),
            hits_path: PathBuf::from("data/ga_hits.jsonl"),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            search_folds: 2,
            report_folds: 5,
            grid: ParamGrid::default(),
        }
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200],
            max_depth: vec![10, 12],
            min_samples_split: vec![50],
            min_samples_leaf: vec![20],
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.7,
            medium_threshold: 0.3,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5001".to_string(),
            max_batch_size: 1000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AppConfig {
    /// Load from JSON file if present; otherwise return default.
    /// Runs before logging is installed, so a bad file is reported on stderr.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<AppConfig>(&data).map_err(|e| e.to_string()));
        match parsed {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
