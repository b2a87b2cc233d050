//! Bagged regression trees

use super::tree::{RegressionTree, TreeParams};
use super::Regressor;
use crate::error::{TrainingError, TrainingResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: TreeParams {
                max_depth: 20,
                min_samples_split: 5,
                min_samples_leaf: 2,
            },
            seed: 42,
        }
    }
}

/// Average of trees fitted on bootstrap resamples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(params: &ForestParams, x: &[Vec<f64>], y: &[f64]) -> TrainingResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(TrainingError::Shape(format!(
                "forest needs matching non-empty data ({} rows, {} targets)",
                x.len(),
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(TrainingError::Shape("forest needs at least one tree".into()));
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(RegressionTree::fit(&params.tree, x, y, &sample)?);
        }

        debug!(trees = trees.len(), samples = n, "Random forest fitted");
        Ok(Self { trees })
    }

    #[cfg(test)]
    pub(crate) fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean impurity importance across trees, normalised to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let Some(first) = self.trees.first() else {
            return Vec::new();
        };
        let mut totals = vec![0.0; first.n_features()];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(normalised(tree.raw_importances())) {
                *total += value;
            }
        }
        normalised(&totals)
    }
}

impl Regressor for RandomForest {
    fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }
}

/// Scale to sum to 1 (all zeros stay zero)
pub(crate) fn normalised(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, 7.0]).collect();
        let y = (0..n).map(|i| 3.0 * i as f64 + 10.0).collect();
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (x, y) = linear_data(60);
        let a = RandomForest::fit(&small_params(), &x, &y).unwrap();
        let b = RandomForest::fit(&small_params(), &x, &y).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 10);
    }

    #[test]
    fn test_predictions_track_target() {
        let (x, y) = linear_data(60);
        let forest = RandomForest::fit(&small_params(), &x, &y).unwrap();
        let pred = forest.predict_row(&[30.0, 7.0]);
        assert!((pred - 100.0).abs() < 15.0, "prediction {}", pred);
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let (x, y) = linear_data(60);
        let forest = RandomForest::fit(&small_params(), &x, &y).unwrap();
        let importances = forest.feature_importances();
        assert_eq!(importances.len(), 2);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // Constant column can never split
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(RandomForest::fit(&small_params(), &[], &[]).is_err());
    }
}
