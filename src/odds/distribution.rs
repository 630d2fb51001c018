//! Normal model of the final margin.
//!
//! The regressor gives a mean signed margin; the spread comes from the
//! training history. Each player's view uses its own signed mean, so the
//! loser's distribution is the winner's mirrored through zero.

use serde::Serialize;

use super::{probability_to_american_odds, AmericanOdds};
use crate::data::models::MAX_MARGIN;

/// Standard normal CDF (Abramowitz–Stegun 7.1.26 erf).
pub fn normal_cdf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + p * z);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-z * z).exp();

    0.5 * (1.0 + sign * y)
}

fn cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    normal_cdf((x - mean) / std_dev)
}

/// Probability and price of one exact margin, for both players.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarginOdds {
    #[serde(skip)]
    pub margin: u8,
    pub winner_probability: f64,
    pub winner_odds: AmericanOdds,
    pub loser_probability: f64,
    pub loser_odds: AmericanOdds,
}

/// P(margin lands on each of 1..=5) for the predicted winner and loser.
///
/// `winner_margin` is the signed margin from the predicted winner's side.
pub fn margin_distribution(winner_margin: f64, std_dev: f64) -> Vec<MarginOdds> {
    (1..=MAX_MARGIN)
        .map(|m| {
            let winner_probability = bucket_probability(winner_margin, std_dev, m);
            let loser_probability = bucket_probability(-winner_margin, std_dev, m);
            MarginOdds {
                margin: m,
                winner_probability,
                winner_odds: probability_to_american_odds(winner_probability),
                loser_probability,
                loser_odds: probability_to_american_odds(loser_probability),
            }
        })
        .collect()
}

/// P(true margin falls in [m − 0.5, m + 0.5]).
fn bucket_probability(mean: f64, std_dev: f64, m: u8) -> f64 {
    let m = f64::from(m);
    (cdf(m + 0.5, mean, std_dev) - cdf(m - 0.5, mean, std_dev)).clamp(0.0, 1.0)
}

/// P(margin ≥ 5) from the player's own signed margin.
pub fn sweep_probability(signed_margin: f64, std_dev: f64) -> f64 {
    (1.0 - cdf(f64::from(MAX_MARGIN), signed_margin, std_dev)).clamp(0.0, 1.0)
}

/// Sweep odds for a player.
pub fn sweep_odds(signed_margin: f64, std_dev: f64) -> AmericanOdds {
    probability_to_american_odds(sweep_probability(signed_margin, std_dev))
}
