//! Training diagnostics
//!
//! Written next to the models as `model_training_stats.json`.

use crate::error::TrainingResult;
use crate::ml::{ModelFamily, Scores};
use crate::types::PlayerTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATS_FILE_NAME: &str = "model_training_stats.json";

/// One candidate family's scores on one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub family: ModelFamily,
    pub train: Scores,
    pub test: Scores,
    /// Mean held-out MAE across folds of the training partition
    pub cv_mae: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Summary of the target distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl TargetSummary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Self {
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
            min: sorted[0],
            max: sorted[n - 1],
        }
    }
}

/// Outcome of training one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStats {
    pub model_name: ModelFamily,
    pub train_samples: usize,
    pub test_samples: usize,
    pub test_mae: f64,
    pub test_rmse: f64,
    pub test_r2: f64,
    pub cv_mae: Option<f64>,
    pub target: TargetSummary,
    pub candidates: Vec<CandidateReport>,
    /// Sorted descending; empty for linear models
    pub feature_importance: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTarget {
    pub target: PlayerTarget,
    pub valid_samples: usize,
    pub reason: String,
}

/// Diagnostics for a whole training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub trained_at: DateTime<Utc>,
    pub reference_records: usize,
    pub reference_year: i32,
    pub targets: BTreeMap<PlayerTarget, TargetStats>,
    pub skipped: Vec<SkippedTarget>,
}

impl TrainingStats {
    pub fn new(reference_records: usize, reference_year: i32) -> Self {
        Self {
            trained_at: gamerec_common::time::now(),
            reference_records,
            reference_year,
            targets: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    /// Write `model_training_stats.json` into `dir`
    pub fn save(&self, dir: &Path) -> TrainingResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STATS_FILE_NAME);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
