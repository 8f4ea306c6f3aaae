//! Raw clickstream inputs: session rows, hit rows, and per-session hit aggregation.

mod aggregate;

pub use aggregate::{aggregate_hits, HitAggregate};

use crate::error::DataError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One visit. Raw attributes only; everything derived lives in the feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    /// `YYYY-MM-DD`
    pub visit_date: String,
    /// `HH:MM:SS`
    pub visit_time: String,
    #[serde(default)]
    pub device_category: Option<String>,
    #[serde(default)]
    pub device_os: Option<String>,
    #[serde(default)]
    pub geo_city: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    pub visit_number: u32,
}

/// One tracked event within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub session_id: String,
    pub hit_number: u32,
    #[serde(default)]
    pub hit_page_path: Option<String>,
    #[serde(default)]
    pub hit_time: Option<f64>,
    #[serde(default)]
    pub event_action: Option<String>,
}

pub fn load_sessions(path: &Path) -> Result<Vec<Session>, DataError> {
    load_jsonl(path)
}

pub fn load_hits(path: &Path) -> Result<Vec<Hit>, DataError> {
    load_jsonl(path)
}

/// Read a JSON Lines file. Blank lines are skipped; line numbers in errors are 1-based.
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DataError> {
    let io_err = |source| DataError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_err)?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| DataError::Parse {
            path: path.display().to_string(),
            line: i + 1,
            source,
        })?;
        out.push(record);
    }
    Ok(out)
}
