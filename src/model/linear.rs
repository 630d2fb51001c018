use super::linalg::{dot, solve_spd};

/// Ridge added to non-bias weights; one-hot blocks are collinear with the
/// bias, so plain least squares would be singular.
const DEFAULT_RIDGE: f64 = 1e-6;

/// Least-squares linear regression on the shared feature layout.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    weights: Vec<f64>,
}

impl LinearRegression {
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Option<Self> {
        Self::fit_with_ridge(x, y, DEFAULT_RIDGE)
    }

    pub fn fit_with_ridge(x: &[Vec<f64>], y: &[f64], ridge: f64) -> Option<Self> {
        let n_features = x.first()?.len();
        if x.len() != y.len() || x.iter().any(|row| row.len() != n_features) {
            return None;
        }

        let mut xtx = vec![vec![0.0f64; n_features]; n_features];
        let mut xty = vec![0.0f64; n_features];
        for (row, &target) in x.iter().zip(y) {
            for j in 0..n_features {
                if row[j] == 0.0 {
                    continue;
                }
                xty[j] += row[j] * target;
                for k in j..n_features {
                    xtx[j][k] += row[j] * row[k];
                }
            }
        }
        for j in 0..n_features {
            if j > 0 {
                xtx[j][j] += ridge;
            }
            for k in 0..j {
                xtx[j][k] = xtx[k][j];
            }
        }

        let weights = solve_spd(&xtx, &xty)?;
        Some(LinearRegression { weights })
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        dot(&self.weights, x)
    }

    /// Root-mean-square error over a labelled set.
    pub fn rmse(&self, x: &[Vec<f64>], y: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let sse: f64 = x
            .iter()
            .zip(y)
            .map(|(row, &target)| (self.predict(row) - target).powi(2))
            .sum();
        (sse / x.len() as f64).sqrt()
    }
}
