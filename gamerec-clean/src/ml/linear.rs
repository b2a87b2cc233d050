//! Ordinary least squares with intercept
//!
//! Solved through the normal equations on centred data. A vanishing ridge term
//! keeps constant or collinear columns from making the system singular; such
//! columns end up with a coefficient near zero.

use super::Regressor;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};

const RIDGE_SCALE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegression {
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> TrainingResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(TrainingError::Shape(format!(
                "regression needs matching non-empty data ({} rows, {} targets)",
                x.len(),
                y.len()
            )));
        }
        let n = x.len() as f64;
        let p = x[0].len();
        if x.iter().any(|row| row.len() != p) {
            return Err(TrainingError::Shape("rows have differing feature counts".into()));
        }

        let x_mean: Vec<f64> = (0..p)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;

        // Normal equations on centred columns
        let mut gram = vec![vec![0.0; p]; p];
        let mut rhs = vec![0.0; p];
        for (row, target) in x.iter().zip(y) {
            let centred: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            let dy = target - y_mean;
            for a in 0..p {
                rhs[a] += centred[a] * dy;
                for b in a..p {
                    gram[a][b] += centred[a] * centred[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                gram[a][b] = gram[b][a];
            }
        }

        let max_diag = (0..p).map(|j| gram[j][j]).fold(0.0_f64, f64::max);
        let ridge = RIDGE_SCALE * max_diag.max(1.0);
        for (j, row) in gram.iter_mut().enumerate() {
            row[j] += ridge;
        }

        let coefficients = solve(gram, rhs)?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TrainingError::Numerical(
                "least squares produced non-finite coefficients".into(),
            ));
        }

        Ok(Self {
            intercept,
            coefficients,
        })
    }
}

impl Regressor for LinearRegression {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> TrainingResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < f64::MIN_POSITIVE {
            return Err(TrainingError::Numerical(format!(
                "singular system at column {}",
                col
            )));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Ok(solution)
}
