//! L2-regularised logistic regression fitted by Newton's method.
//!
//! Objective: `0.5 * ||w||² + C * Σ logloss(sigmoid(w·x), y)`, with the
//! bias term left unpenalised.

use super::linalg::{dot, solve_spd};

const EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct LogisticConfig {
    /// Inverse regularisation strength
    pub c: f64,
    pub max_iters: usize,
    /// Stop once the largest Newton step falls below this
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iters: 100,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    /// Newton iterations used during fitting
    pub iterations: usize,
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

impl LogisticRegression {
    /// Fit on encoded rows `x` (bias in column 0) and 0/1 labels `y`.
    ///
    /// Returns `None` when the inputs are empty or mismatched, or the
    /// Hessian stops being positive definite.
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: LogisticConfig) -> Option<Self> {
        let n_features = x.first()?.len();
        if x.len() != y.len() || x.iter().any(|row| row.len() != n_features) {
            return None;
        }
        let penalty = 1.0 / config.c.max(EPS);
        let mut w = vec![0.0f64; n_features];
        let mut iterations = 0;

        for _ in 0..config.max_iters.max(1) {
            iterations += 1;
            let mut grad = vec![0.0f64; n_features];
            let mut hess = vec![vec![0.0f64; n_features]; n_features];

            for (row, &label) in x.iter().zip(y) {
                let p = sigmoid(dot(&w, row));
                let err = p - label;
                let weight = (p * (1.0 - p)).max(EPS);
                for j in 0..n_features {
                    if row[j] == 0.0 {
                        continue;
                    }
                    grad[j] += err * row[j];
                    for k in j..n_features {
                        hess[j][k] += weight * row[j] * row[k];
                    }
                }
            }

            // Working with objective / C, so the penalty term is w / C.
            for j in 1..n_features {
                grad[j] += penalty * w[j];
                hess[j][j] += penalty;
            }
            for j in 0..n_features {
                for k in 0..j {
                    hess[j][k] = hess[k][j];
                }
            }

            let step = solve_spd(&hess, &grad)?;
            let mut max_step = 0.0f64;
            for (wj, sj) in w.iter_mut().zip(&step) {
                *wj -= sj;
                max_step = max_step.max(sj.abs());
            }
            if w.iter().any(|v| !v.is_finite()) {
                return None;
            }
            if max_step < config.tolerance {
                break;
            }
        }

        Some(LogisticRegression {
            weights: w,
            iterations,
        })
    }

    /// Probability that the label is 1.
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, x))
    }

    /// Mean log-loss over a labelled set.
    pub fn log_loss(&self, x: &[Vec<f64>], y: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let total: f64 = x
            .iter()
            .zip(y)
            .map(|(row, &label)| {
                let p = self.predict_proba(row).clamp(EPS, 1.0 - EPS);
                -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
            })
            .sum();
        total / x.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bias_only_matches_base_rate() {
        // 7 of 10 positive, nothing but the unpenalised bias to fit.
        let x: Vec<Vec<f64>> = (0..10).map(|_| vec![1.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 7 { 1.0 } else { 0.0 }).collect();
        let model = LogisticRegression::fit(&x, &y, LogisticConfig::default()).unwrap();
        assert_relative_eq!(model.predict_proba(&[1.0]), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn learns_direction_of_feature() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let f = if i % 2 == 0 { 1.0 } else { 0.0 };
            x.push(vec![1.0, f]);
            // feature on → mostly wins
            let label = if f == 1.0 { (i % 10 != 0) as u8 } else { (i % 10 == 1) as u8 };
            y.push(f64::from(label));
        }
        let model = LogisticRegression::fit(&x, &y, LogisticConfig::default()).unwrap();
        assert!(model.predict_proba(&[1.0, 1.0]) > 0.5);
        assert!(model.predict_proba(&[1.0, 0.0]) < 0.5);
    }

    #[test]
    fn separable_data_stays_finite() {
        let x = vec![vec![1.0, 1.0], vec![1.0, 0.0]];
        let y = vec![1.0, 0.0];
        let model = LogisticRegression::fit(&x, &y, LogisticConfig::default()).unwrap();
        let p = model.predict_proba(&[1.0, 1.0]);
        assert!(p.is_finite() && p > 0.5 && p < 1.0);
    }

    #[test]
    fn fitting_reduces_log_loss_below_coin_flip() {
        let x = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let y = vec![1.0, 1.0, 0.0, 1.0];
        let model = LogisticRegression::fit(&x, &y, LogisticConfig::default()).unwrap();
        assert!(model.log_loss(&x, &y) < std::f64::consts::LN_2);
    }

    #[test]
    fn rejects_mismatched_input() {
        assert!(LogisticRegression::fit(&[], &[], LogisticConfig::default()).is_none());
        let x = vec![vec![1.0]];
        assert!(LogisticRegression::fit(&x, &[1.0, 0.0], LogisticConfig::default()).is_none());
    }
}
