//! Player-count cluster estimation
//!
//! Models run first, in the order peak_24h → current_players → peak_alltime,
//! each accepted prediction feeding the feature vector for the next. Targets
//! left without a positive prediction go to the heuristic, which anchors on
//! known and model-estimated counts alike.

use crate::error::{CompletionError, TrainingResult};
use crate::features::{Feature, FeatureExtractor};
use crate::heuristic::HeuristicEstimator;
use crate::ml::ModelBank;
use crate::types::{CompletionResult, PlayerTarget, Provenance, Record};
use std::sync::Arc;
use tracing::debug;

pub struct ClusterEstimator {
    bank: Arc<ModelBank>,
    extractor: FeatureExtractor,
    heuristic: HeuristicEstimator,
}

impl ClusterEstimator {
    pub fn new(bank: Arc<ModelBank>, extractor: FeatureExtractor) -> Self {
        Self {
            bank,
            extractor,
            heuristic: HeuristicEstimator::new(),
        }
    }

    /// Estimate the `missing` cluster targets of `record`
    ///
    /// Fails only if a loaded model cannot be evaluated against the features.
    pub fn estimate(
        &self,
        record: &Record,
        missing: &[PlayerTarget],
    ) -> TrainingResult<CompletionResult> {
        let mut features = self.extractor.extract(record);
        let mut result = CompletionResult::new();

        for target in PlayerTarget::ESTIMATION_ORDER {
            if !missing.contains(&target) {
                continue;
            }
            let Some(entry) = self.bank.get(target) else {
                debug!(
                    app_id = record.app_id,
                    reason = %CompletionError::ModelUnavailable(target),
                    "Deferring to heuristic"
                );
                continue;
            };

            let raw = entry.predict(&features)?;
            let prediction = whole_count(raw);
            debug!(app_id = record.app_id, target_field = %target, raw, prediction, "Model prediction");

            if prediction > 0.0 {
                result.supply(target.field(), prediction, Provenance::Model);
                features = features.with_value(Feature::for_target(target), prediction);
            }
        }

        let remaining: Vec<PlayerTarget> = missing
            .iter()
            .copied()
            .filter(|t| !result.contains(t.field()))
            .collect();
        if !remaining.is_empty() {
            result.merge(self.heuristic.estimate(&features, &remaining));
        }

        Ok(result)
    }
}

/// Non-negative whole count, rounded toward zero
fn whole_count(prediction: f64) -> f64 {
    if prediction.is_finite() {
        prediction.trunc().max(0.0)
    } else {
        0.0
    }
}
