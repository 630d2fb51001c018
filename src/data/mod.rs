pub mod loader;
pub mod models;
pub mod source;

pub use loader::load_training_data;
pub use models::{BreakSide, FeatureRow, Inebriated, TrainingRow, TrainingSet};

use thiserror::Error;

/// Failures while turning the match sheet into training rows.
#[derive(Debug, Error)]
pub enum DataError {
    /// Source unreachable, timed out, or not readable as CSV.
    #[error("data source error: {0}")]
    DataSource(String),

    /// One or more required columns are absent from the header.
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A single sheet line could not be parsed. Recovered inside the loader.
    #[error("line {line}: {reason}")]
    RowParse { line: u64, reason: String },
}
