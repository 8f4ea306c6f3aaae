//! Error types, one enum per concern.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {source}")]
    Parse {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("session {session_id}: cannot parse visit timestamp {value:?}")]
    InvalidTimestamp { session_id: String, value: String },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("model file is not a valid bundle: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported bundle format version {0}")]
    UnsupportedVersion(u32),
    #[error("bundle checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },
}

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("model is not loaded")]
    ModelNotLoaded,
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("feature {name}: {reason}")]
    InvalidFeature { name: String, reason: String },
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("training set is empty")]
    EmptyDataset,
    #[error("training labels contain a single class ({0})")]
    SingleClass(u8),
    #[error("parameter grid is empty")]
    EmptyGrid,
    #[error("need at least 2 folds, got {0}")]
    TooFewFolds(usize),
}
