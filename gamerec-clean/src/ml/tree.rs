//! CART regression tree
//!
//! Least-squares splits over all features, stored as a flat node arena so the
//! serialized form stays shallow regardless of depth.

use super::Regressor;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};

/// Growth limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Unnormalised squared-error reduction per feature
    #[serde(default)]
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    /// Samples going left, in the node's index order
    left: Vec<usize>,
    right: Vec<usize>,
}

impl RegressionTree {
    /// Fit on the rows of `x` selected by `indices` (duplicates allowed)
    pub fn fit(
        params: &TreeParams,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
    ) -> TrainingResult<Self> {
        if x.len() != y.len() {
            return Err(TrainingError::Shape(format!(
                "{} rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if indices.is_empty() {
            return Err(TrainingError::Shape("cannot fit a tree on zero samples".into()));
        }
        let n_features = x[indices[0]].len();
        if indices.iter().any(|&i| x[i].len() != n_features) {
            return Err(TrainingError::Shape("rows have differing feature counts".into()));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            n_features,
            importances: vec![0.0; n_features],
        };
        tree.grow(params, x, y, indices.to_vec(), 0);
        Ok(tree)
    }

    /// Grow a subtree and return its node index
    fn grow(
        &mut self,
        params: &TreeParams,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
    ) -> usize {
        let value = mean(indices.iter().map(|&i| y[i]));
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        if depth >= params.max_depth
            || indices.len() < params.min_samples_split
            || indices.len() < 2 * params.min_samples_leaf
        {
            return node_id;
        }

        let Some(split) = best_split(params, x, y, &indices, self.n_features) else {
            return node_id;
        };

        self.importances[split.feature] += split.gain;
        let left = self.grow(params, x, y, split.left, depth + 1);
        let right = self.grow(params, x, y, split.right, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Raw impurity decrease per feature
    pub fn raw_importances(&self) -> &[f64] {
        &self.importances
    }
}

impl Regressor for RegressionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                None => return 0.0,
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    id = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Best least-squares split of a node, if any reduces the error
fn best_split(
    params: &TreeParams,
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    n_features: usize,
) -> Option<BestSplit> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<(usize, f64, f64)> = None;
    let mut order: Vec<usize> = indices.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < params.min_samples_leaf || right_n < params.min_samples_leaf {
                continue;
            }
            let here = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            if here == next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);
            let gain = parent_sse - sse;

            if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature, (here + next) / 2.0, gain));
            }
        }
    }

    let (feature, threshold, gain) = best?;
    let (left, right) = indices
        .iter()
        .copied()
        .partition(|&i| x[i][feature] <= threshold);
    Some(BestSplit {
        feature,
        threshold,
        gain,
        left,
        right,
    })
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y = (0..20).map(|i| if i < 10 { 5.0 } else { 50.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let all: Vec<usize> = (0..x.len()).collect();
        let tree = RegressionTree::fit(&TreeParams::default(), &x, &y, &all).unwrap();

        assert_eq!(tree.predict_row(&[3.0, 0.0]), 5.0);
        assert_eq!(tree.predict_row(&[15.0, 2.0]), 50.0);
        assert_eq!(tree.depth(), 1);
        // Only the first feature separates the two levels
        assert!(tree.raw_importances()[0] > 0.0);
        assert_eq!(tree.raw_importances()[1], 0.0);
    }

    #[test]
    fn test_depth_limit() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let all: Vec<usize> = (0..64).collect();
        let params = TreeParams {
            max_depth: 3,
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&params, &x, &y, &all).unwrap();
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_min_leaf_prevents_split() {
        let (x, y) = step_data();
        let all: Vec<usize> = (0..x.len()).collect();
        let params = TreeParams {
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 11,
        };
        let tree = RegressionTree::fit(&params, &x, &y, &all).unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict_row(&[0.0, 0.0]), 27.5);
    }

    #[test]
    fn test_rejects_mismatched_shapes() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![1.0];
        assert!(RegressionTree::fit(&TreeParams::default(), &x, &y, &[0]).is_err());
    }
}
