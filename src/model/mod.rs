pub mod encoder;
pub mod linalg;
pub mod linear;
pub mod logistic;

pub use encoder::FeatureEncoder;
pub use linear::LinearRegression;
pub use logistic::{LogisticConfig, LogisticRegression};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::data::{FeatureRow, TrainingRow, TrainingSet};

/// Margin spread used when the history is too small or too uniform to
/// estimate one.
const FALLBACK_MARGIN_STD_DEV: f64 = 1.0;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("no usable match rows to train on")]
    EmptyDataset,

    #[error("{0} fit did not converge")]
    Diverged(&'static str),
}

/// Everything a prediction needs, fitted once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub encoder: FeatureEncoder,
    /// P(playerA wins)
    pub classifier: LogisticRegression,
    /// Signed margin from playerA's side
    pub regressor: LinearRegression,
    /// Sample std. dev. of the signed margin over the mirrored training rows
    pub margin_std_dev: f64,
    /// Training rows, kept for the empirical spread market
    pub history: Vec<TrainingRow>,
    pub players: Vec<String>,
    pub skipped_rows: usize,
    pub trained_at: DateTime<Utc>,
}

/// Encoded feature vector, scorable by either model.
#[derive(Debug, Clone)]
pub struct Features(Vec<f64>);

impl ModelBundle {
    pub fn encode(&self, row: &FeatureRow) -> Features {
        Features(self.encoder.encode(row))
    }

    pub fn win_probability(&self, features: &Features) -> f64 {
        self.classifier.predict_proba(&features.0)
    }

    pub fn expected_margin(&self, features: &Features) -> f64 {
        self.regressor.predict(&features.0)
    }

    pub fn trained_rows(&self) -> usize {
        self.history.len()
    }
}

/// Fit the classifier and regressor on a mirrored training set.
pub fn train_models(data: &TrainingSet) -> Result<ModelBundle, TrainError> {
    if data.is_empty() {
        return Err(TrainError::EmptyDataset);
    }

    let encoder = FeatureEncoder::fit(&data.rows);
    let x: Vec<Vec<f64>> = data
        .rows
        .iter()
        .map(|r| encoder.encode(&r.features))
        .collect();
    let labels: Vec<f64> = data.rows.iter().map(TrainingRow::label).collect();
    let margins: Vec<f64> = data.rows.iter().map(|r| f64::from(r.margin)).collect();

    let classifier = LogisticRegression::fit(&x, &labels, LogisticConfig::default())
        .ok_or(TrainError::Diverged("classifier"))?;
    let regressor =
        LinearRegression::fit(&x, &margins).ok_or(TrainError::Diverged("regressor"))?;
    let margin_std_dev = margin_std_dev(&margins);

    info!(
        "Trained on {} rows ({} features): classifier {} iters, log-loss {:.4}; margin RMSE {:.3}, σ={:.3}",
        data.len(),
        encoder.width(),
        classifier.iterations,
        classifier.log_loss(&x, &labels),
        regressor.rmse(&x, &margins),
        margin_std_dev
    );

    Ok(ModelBundle {
        encoder,
        classifier,
        regressor,
        margin_std_dev,
        history: data.rows.clone(),
        players: data.players(),
        skipped_rows: data.skipped_rows,
        trained_at: Utc::now(),
    })
}

/// Sample standard deviation (n − 1), floored to a usable positive value.
pub fn margin_std_dev(margins: &[f64]) -> f64 {
    if margins.len() < 2 {
        return FALLBACK_MARGIN_STD_DEV;
    }
    let n = margins.len() as f64;
    let mean = margins.iter().sum::<f64>() / n;
    let var = margins.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let sd = var.sqrt();
    if sd.is_finite() && sd > 0.0 {
        sd
    } else {
        FALLBACK_MARGIN_STD_DEV
    }
}
