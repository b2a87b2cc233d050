//! Offline model training
//!
//! For each player-count target independently:
//! 1. Keep reference rows whose target is strictly positive
//! 2. Project onto the target's feature subset
//! 3. Seeded 80/20 shuffle split
//! 4. Fit every candidate family on the same split
//! 5. Pick the lowest held-out MAE (ties: forest, boosting, linear)
//!
//! Targets with fewer than `min_samples` valid rows get no model; inference
//! falls back to the heuristic for them.

pub mod split;
pub mod stats;

pub use split::{k_fold, shuffle_split, Split};
pub use stats::{
    CandidateReport, FeatureImportance, SkippedTarget, TargetStats, TargetSummary, TrainingStats,
};

use crate::error::{TrainingError, TrainingResult};
use crate::features::{target_features, Feature, FeatureExtractor, FeatureVector};
use crate::ml::{metrics, FamilyParams, ModelBank, ModelEntry, ModelFamily, Regressor, Scores, TrainedModel};
use crate::types::{PlayerTarget, Record};
use tracing::{debug, info, warn};

/// Trainer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    pub params: FamilyParams,
    /// Minimum positive-target rows for a model to be trained
    pub min_samples: usize,
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            params: FamilyParams::default(),
            min_samples: 10,
            test_fraction: 0.2,
            cv_folds: 5,
            seed: 42,
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bank: ModelBank,
    pub stats: TrainingStats,
}

/// Feature matrix and target vector for one target
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub target: PlayerTarget,
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl TrainingData {
    /// Rows with a strictly positive target, projected onto its features
    pub fn prepare(target: PlayerTarget, vectors: &[FeatureVector]) -> Self {
        let features = target_features(target);
        let target_feature = Feature::for_target(target);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for vector in vectors {
            let value = vector.get(target_feature);
            if value > 0.0 {
                x.push(features.iter().map(|f| vector.get(*f)).collect());
                y.push(value);
            }
        }
        Self {
            target,
            feature_names: features.iter().map(|f| f.name().to_string()).collect(),
            x,
            y,
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    fn rows(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            indices.iter().map(|&i| self.x[i].clone()).collect(),
            indices.iter().map(|&i| self.y[i]).collect(),
        )
    }
}

struct Candidate {
    model: TrainedModel,
    report: CandidateReport,
}

pub struct Trainer {
    config: TrainerConfig,
    extractor: FeatureExtractor,
}

impl Trainer {
    pub fn new(config: TrainerConfig, extractor: FeatureExtractor) -> Self {
        Self { config, extractor }
    }

    /// Train a model bank from a fully populated reference dataset
    pub fn train(&self, reference: &[Record]) -> TrainingOutcome {
        info!(
            records = reference.len(),
            reference_year = self.extractor.reference_year(),
            "Training player-count models"
        );

        let vectors: Vec<FeatureVector> =
            reference.iter().map(|r| self.extractor.extract(r)).collect();

        let mut bank = ModelBank::new();
        let mut stats = TrainingStats::new(reference.len(), self.extractor.reference_year());

        for target in PlayerTarget::ALL {
            let data = TrainingData::prepare(target, &vectors);
            match self.train_target(&data) {
                Ok((entry, target_stats)) => {
                    info!(
                        target_field = %target,
                        family = %target_stats.model_name,
                        test_mae = target_stats.test_mae,
                        test_r2 = target_stats.test_r2,
                        "Selected model"
                    );
                    bank.insert(entry);
                    stats.targets.insert(target, target_stats);
                }
                Err(e) => {
                    warn!(target_field = %target, samples = data.len(), error = %e, "Skipping target");
                    stats.skipped.push(SkippedTarget {
                        target,
                        valid_samples: data.len(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        TrainingOutcome { bank, stats }
    }

    /// Fit all candidates on one target and keep the best
    pub fn train_target(&self, data: &TrainingData) -> TrainingResult<(ModelEntry, TargetStats)> {
        if data.len() < self.config.min_samples {
            return Err(TrainingError::InsufficientSamples {
                target: data.target,
                count: data.len(),
                required: self.config.min_samples,
            });
        }

        let split = shuffle_split(data.len(), self.config.test_fraction, self.config.seed);
        let (x_train, y_train) = data.rows(&split.train);
        let (x_test, y_test) = data.rows(&split.test);

        let mut candidates = Vec::new();
        for family in ModelFamily::ALL {
            match self.fit_candidate(family, &x_train, &y_train, &x_test, &y_test) {
                Ok(candidate) => {
                    debug!(
                        target_field = %data.target,
                        family = %family,
                        train_mae = candidate.report.train.mae,
                        test_mae = candidate.report.test.mae,
                        cv_mae = ?candidate.report.cv_mae,
                        "Candidate scored"
                    );
                    candidates.push(candidate);
                }
                Err(e) => {
                    warn!(target_field = %data.target, family = %family, error = %e, "Candidate failed to fit");
                }
            }
        }

        let reports: Vec<CandidateReport> = candidates.iter().map(|c| c.report.clone()).collect();
        let best = select_best(candidates).ok_or_else(|| {
            TrainingError::Numerical(format!("no candidate could be fitted for {}", data.target))
        })?;

        let feature_importance = best
            .model
            .feature_importances()
            .map(|values| ranked_importances(&data.feature_names, &values))
            .unwrap_or_default();

        let target_stats = TargetStats {
            model_name: best.report.family,
            train_samples: split.train.len(),
            test_samples: split.test.len(),
            test_mae: best.report.test.mae,
            test_rmse: best.report.test.rmse,
            test_r2: best.report.test.r2,
            cv_mae: best.report.cv_mae,
            target: TargetSummary::of(&data.y),
            candidates: reports,
            feature_importance,
        };

        let entry = ModelEntry {
            target: data.target,
            model: best.model,
            feature_names: data.feature_names.clone(),
        };
        Ok((entry, target_stats))
    }

    fn fit_candidate(
        &self,
        family: ModelFamily,
        x_train: &[Vec<f64>],
        y_train: &[f64],
        x_test: &[Vec<f64>],
        y_test: &[f64],
    ) -> TrainingResult<Candidate> {
        let model = self.config.params.fit(family, x_train, y_train)?;
        let train = Scores::compute(y_train, &model.predict(x_train));
        let test = Scores::compute(y_test, &model.predict(x_test));
        let cv_mae = self.cross_validate(family, x_train, y_train);

        Ok(Candidate {
            model,
            report: CandidateReport {
                family,
                train,
                test,
                cv_mae,
            },
        })
    }

    /// Mean fold MAE on the training partition; `None` if any fold fails
    fn cross_validate(&self, family: ModelFamily, x: &[Vec<f64>], y: &[f64]) -> Option<f64> {
        let folds = k_fold(y.len(), self.config.cv_folds);
        if folds.is_empty() {
            return None;
        }

        let mut total = 0.0;
        for fold in &folds {
            let x_fit: Vec<Vec<f64>> = fold.train.iter().map(|&i| x[i].clone()).collect();
            let y_fit: Vec<f64> = fold.train.iter().map(|&i| y[i]).collect();
            let model = self.config.params.fit(family, &x_fit, &y_fit).ok()?;

            let x_val: Vec<Vec<f64>> = fold.test.iter().map(|&i| x[i].clone()).collect();
            let y_val: Vec<f64> = fold.test.iter().map(|&i| y[i]).collect();
            total += metrics::mae(&y_val, &model.predict(&x_val));
        }
        Some(total / folds.len() as f64)
    }
}

/// Lowest held-out MAE; candidates arrive in preference order so the first wins ties
fn select_best(candidates: Vec<Candidate>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        let better = match &best {
            None => true,
            Some(current) => candidate.report.test.mae < current.report.test.mae,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

fn ranked_importances(names: &[String], values: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(values)
        .map(|(name, value)| FeatureImportance {
            feature: name.clone(),
            importance: *value,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}
