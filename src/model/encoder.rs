use std::collections::HashMap;

use crate::data::{FeatureRow, TrainingRow};

/// Number of one-hot encoded columns (see [`FeatureRow::categorical_values`]).
const CATEGORICAL_COLUMNS: usize = 6;

/// Shared feature layout for the classifier and the regressor.
///
/// Layout: `[bias, one-hot(playerA), one-hot(playerB), one-hot(break_sideA),
/// one-hot(break_sideB), one-hot(inebriated), one-hot(day_of_week), hour]`.
/// Category values not seen during fitting encode to all zeros.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    vocab: Vec<HashMap<String, usize>>,
    hour_index: usize,
    hour_mean: f64,
    hour_scale: f64,
}

impl FeatureEncoder {
    pub fn fit(rows: &[TrainingRow]) -> Self {
        let mut vocab: Vec<HashMap<String, usize>> = vec![HashMap::new(); CATEGORICAL_COLUMNS];
        let mut next = 1usize;
        for (col, column_vocab) in vocab.iter_mut().enumerate() {
            for row in rows {
                let value = row.features.categorical_values()[col];
                if !column_vocab.contains_key(value) {
                    column_vocab.insert(value.to_string(), next);
                    next += 1;
                }
            }
        }

        let n = rows.len().max(1) as f64;
        let hour_mean = rows
            .iter()
            .map(|r| f64::from(r.features.hour_of_day))
            .sum::<f64>()
            / n;
        let hour_var = rows
            .iter()
            .map(|r| (f64::from(r.features.hour_of_day) - hour_mean).powi(2))
            .sum::<f64>()
            / n;
        let hour_scale = if hour_var > 0.0 { hour_var.sqrt() } else { 1.0 };

        FeatureEncoder {
            vocab,
            hour_index: next,
            hour_mean,
            hour_scale,
        }
    }

    /// Total feature count, bias included.
    pub fn width(&self) -> usize {
        self.hour_index + 1
    }

    pub fn encode(&self, row: &FeatureRow) -> Vec<f64> {
        let mut x = vec![0.0; self.width()];
        x[0] = 1.0;
        for (column_vocab, value) in self.vocab.iter().zip(row.categorical_values()) {
            if let Some(&idx) = column_vocab.get(value) {
                x[idx] = 1.0;
            }
        }
        x[self.hour_index] = (f64::from(row.hour_of_day) - self.hour_mean) / self.hour_scale;
        x
    }

    /// Whether `player` appeared on either side during fitting.
    pub fn knows_player(&self, player: &str) -> bool {
        self.vocab[0].contains_key(player) || self.vocab[1].contains_key(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::models::MatchRecord;
    use crate::data::{BreakSide, Inebriated};
    use chrono::NaiveDate;

    fn rows() -> Vec<TrainingRow> {
        let record = MatchRecord {
            winner: "Austin".into(),
            loser: "Brett".into(),
            winner_break_side: BreakSide::WindowSide,
            margin: 2,
            inebriated: Inebriated::Yes,
            timestamp: NaiveDate::from_ymd_opt(2025, 8, 15)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
        };
        record.mirror().to_vec()
    }

    #[test]
    fn width_counts_every_category() {
        let enc = FeatureEncoder::fit(&rows());
        // bias + 2 + 2 + 2 + 2 + 1 + 1 + hour
        assert_eq!(enc.width(), 12);
    }

    #[test]
    fn known_row_sets_one_slot_per_column() {
        let rows = rows();
        let enc = FeatureEncoder::fit(&rows);
        let x = enc.encode(&rows[0].features);
        assert_eq!(x[0], 1.0);
        let ones = x[1..enc.width() - 1].iter().filter(|v| **v == 1.0).count();
        assert_eq!(ones, CATEGORICAL_COLUMNS);
    }

    #[test]
    fn unknown_categories_encode_to_zero() {
        let rows = rows();
        let enc = FeatureEncoder::fit(&rows);
        let mut features = rows[0].features.clone();
        features.player_a = "Casey".into();
        features.player_b = "Dana".into();
        let x = enc.encode(&features);
        let ones = x[1..enc.width() - 1].iter().filter(|v| **v == 1.0).count();
        assert_eq!(ones, CATEGORICAL_COLUMNS - 2);
        assert!(!enc.knows_player("Casey"));
        assert!(enc.knows_player("Brett"));
    }

    #[test]
    fn constant_hour_does_not_divide_by_zero() {
        let rows = rows();
        let enc = FeatureEncoder::fit(&rows);
        let x = enc.encode(&rows[0].features);
        assert_eq!(x[enc.width() - 1], 0.0);
    }
}
