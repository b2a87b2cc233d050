//! Model bank: one trained model per player-count target
//!
//! Built offline by the trainer, persisted as `model_<target>.json`, then
//! loaded once and shared read-only by every completion call.

use super::{Regressor, TrainedModel};
use crate::error::TrainingResult;
use crate::features::FeatureVector;
use crate::types::PlayerTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A target's model plus the feature order it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub target: PlayerTarget,
    pub model: TrainedModel,
    pub feature_names: Vec<String>,
}

impl ModelEntry {
    /// Raw model output for a feature vector
    pub fn predict(&self, features: &FeatureVector) -> TrainingResult<f64> {
        let row = features.select(&self.feature_names)?;
        Ok(self.model.predict_row(&row))
    }
}

/// Immutable target → model mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelBank {
    entries: BTreeMap<PlayerTarget, ModelEntry>,
}

impl ModelBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ModelEntry) {
        self.entries.insert(entry.target, entry);
    }

    pub fn get(&self, target: PlayerTarget) -> Option<&ModelEntry> {
        self.entries.get(&target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write one JSON file per entry into `dir`
    pub fn save(&self, dir: &Path) -> TrainingResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            let path = model_path(dir, entry.target);
            let temp_path = path.with_extension("json.tmp");
            fs::write(&temp_path, serde_json::to_string(entry)?)?;
            fs::rename(&temp_path, &path)?;
            info!(target_field = %entry.target, path = %path.display(), "Saved model");
            written.push(path);
        }
        Ok(written)
    }
}

/// Artifact path for a target
pub fn model_path(dir: &Path, target: PlayerTarget) -> PathBuf {
    dir.join(format!("model_{}.json", target.as_str()))
}

/// Load whatever models `dir` holds
///
/// Absent or unreadable files mean "no model for this target"; they are
/// logged and skipped, never fatal.
pub fn load_model_bank(dir: &Path) -> ModelBank {
    let mut bank = ModelBank::new();

    for target in PlayerTarget::ALL {
        let path = model_path(dir, target);
        if !path.exists() {
            debug!(target_field = %target, path = %path.display(), "No model file");
            continue;
        }

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<ModelEntry>(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(entry) if entry.target == target => {
                debug!(
                    target_field = %target,
                    family = %entry.model.family(),
                    features = entry.feature_names.len(),
                    "Loaded model"
                );
                bank.insert(entry);
            }
            Ok(entry) => {
                warn!(
                    path = %path.display(),
                    expected = %target,
                    found = %entry.target,
                    "Model file holds a different target, skipping"
                );
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable model file, skipping");
            }
        }
    }

    info!(models = bank.len(), dir = %dir.display(), "Model bank loaded");
    bank
}
