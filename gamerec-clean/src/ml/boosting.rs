//! Least-squares gradient boosting

use super::forest::normalised;
use super::tree::{mean, RegressionTree, TreeParams};
use super::Regressor;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: 10,
                min_samples_split: 2,
                min_samples_leaf: 1,
            },
        }
    }
}

/// Additive tree ensemble fitted to successive residuals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(params: &BoostingParams, x: &[Vec<f64>], y: &[f64]) -> TrainingResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(TrainingError::Shape(format!(
                "boosting needs matching non-empty data ({} rows, {} targets)",
                x.len(),
                y.len()
            )));
        }
        if !(params.learning_rate > 0.0) {
            return Err(TrainingError::Numerical(format!(
                "learning rate must be positive, got {}",
                params.learning_rate
            )));
        }

        let all: Vec<usize> = (0..x.len()).collect();
        let init = mean(y.iter().copied());
        let mut current = vec![init; y.len()];
        let mut trees = Vec::with_capacity(params.n_rounds);

        for _ in 0..params.n_rounds {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            let tree = RegressionTree::fit(&params.tree, x, &residuals, &all)?;
            for (pred, row) in current.iter_mut().zip(x) {
                *pred += params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        debug!(rounds = trees.len(), samples = x.len(), "Gradient boosting fitted");
        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    #[cfg(test)]
    pub(crate) fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    /// Summed impurity importance across rounds, normalised to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let Some(first) = self.trees.first() else {
            return Vec::new();
        };
        let mut totals = vec![0.0; first.n_features()];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.raw_importances()) {
                *total += value;
            }
        }
        normalised(&totals)
    }
}

impl Regressor for GradientBoosting {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}
