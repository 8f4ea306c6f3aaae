//! Model bundle: classifier + feature schema + target actions + frozen city table, saved as one
//! JSON file. The payload is checksummed (SHA-256) so a truncated or edited file fails to load.

use super::{Classifier, RandomForest};
use crate::error::ModelError;
use crate::features::CityStatistics;
use crate::labels::TargetActionSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    format_version: u32,
    checksum: String,
    model: &'a RawValue,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    format_version: u32,
    checksum: String,
    model: Box<RawValue>,
}

fn checksum(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

/// Immutable once built or loaded; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel<C = RandomForest> {
    pub classifier: C,
    /// Column order the classifier was trained on
    pub feature_names: Vec<String>,
    pub target_actions: TargetActionSet,
    pub cities: CityStatistics,
}

impl<C: Classifier> TrainedModel<C> {
    pub fn new(
        classifier: C,
        feature_names: Vec<String>,
        target_actions: TargetActionSet,
        cities: CityStatistics,
    ) -> Self {
        Self {
            classifier,
            feature_names,
            target_actions,
            cities,
        }
    }
}

impl<C: Classifier + Serialize + DeserializeOwned> TrainedModel<C> {
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let payload = RawValue::from_string(serde_json::to_string(self)?)?;
        let envelope = EnvelopeOut {
            format_version: FORMAT_VERSION,
            checksum: checksum(payload.get()),
            model: &payload,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_vec(&envelope)?)?;
        info!(path = %path.display(), features = self.feature_names.len(), "model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path)?;
        let envelope: EnvelopeIn = serde_json::from_str(&data)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(envelope.format_version));
        }
        let actual = checksum(envelope.model.get());
        if actual != envelope.checksum {
            return Err(ModelError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            });
        }
        let model: Self = serde_json::from_str(envelope.model.get())?;
        info!(
            path = %path.display(),
            features = model.feature_names.len(),
            target_actions = model.target_actions.len(),
            cities = model.cities.len(),
            "model loaded"
        );
        Ok(model)
    }
}
