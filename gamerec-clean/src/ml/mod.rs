//! Regression models
//!
//! Three candidate families compete per target:
//! - [`forest::RandomForest`]: bagged CART trees
//! - [`boosting::GradientBoosting`]: least-squares boosted trees
//! - [`linear::LinearRegression`]: OLS with intercept
//!
//! Fitted models are plain serde values, persisted per target by [`bank`].

pub mod bank;
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod tree;

pub use bank::{load_model_bank, ModelBank, ModelEntry};
pub use boosting::{BoostingParams, GradientBoosting};
pub use forest::{ForestParams, RandomForest};
pub use linear::LinearRegression;
pub use metrics::Scores;
pub use tree::{RegressionTree, TreeParams};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fitted model that maps a feature row to a prediction
pub trait Regressor {
    fn predict_row(&self, row: &[f64]) -> f64;

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Candidate model families, in tie-break preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    GradientBoosting,
    Linear,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::Linear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::GradientBoosting => "gradient_boosting",
            ModelFamily::Linear => "linear",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fitted model of any family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TrainedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Linear(LinearRegression),
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            TrainedModel::RandomForest(_) => ModelFamily::RandomForest,
            TrainedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
            TrainedModel::Linear(_) => ModelFamily::Linear,
        }
    }

    /// Normalised impurity importances (tree families only)
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            TrainedModel::RandomForest(m) => Some(m.feature_importances()),
            TrainedModel::GradientBoosting(m) => Some(m.feature_importances()),
            TrainedModel::Linear(_) => None,
        }
    }
}

impl Regressor for TrainedModel {
    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            TrainedModel::RandomForest(m) => m.predict_row(row),
            TrainedModel::GradientBoosting(m) => m.predict_row(row),
            TrainedModel::Linear(m) => m.predict_row(row),
        }
    }
}

/// Hyperparameters for all three families
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyParams {
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl FamilyParams {
    pub fn fit(
        &self,
        family: ModelFamily,
        x: &[Vec<f64>],
        y: &[f64],
    ) -> crate::error::TrainingResult<TrainedModel> {
        Ok(match family {
            ModelFamily::RandomForest => {
                TrainedModel::RandomForest(RandomForest::fit(&self.forest, x, y)?)
            }
            ModelFamily::GradientBoosting => {
                TrainedModel::GradientBoosting(GradientBoosting::fit(&self.boosting, x, y)?)
            }
            ModelFamily::Linear => TrainedModel::Linear(LinearRegression::fit(x, y)?),
        })
    }
}
