//! Probability → sportsbook odds conversion.

pub mod distribution;

pub use distribution::{margin_distribution, normal_cdf, sweep_odds, MarginOdds};

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Bookmaker overround used when none is configured.
pub const DEFAULT_OVERROUND: f64 = 1.05;

/// American (moneyline) odds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmericanOdds {
    /// Negative for favourites, positive for underdogs
    Line(i64),
    /// Probability of 0 or 1; no finite price exists
    Infinite,
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmericanOdds::Line(v) => write!(f, "{:+}", v),
            AmericanOdds::Infinite => f.write_str("∞"),
        }
    }
}

impl Serialize for AmericanOdds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OddsError {
    #[error("cannot apply vig: probabilities sum to {0}")]
    DegenerateInput(f64),
}

/// Convert a win probability to American odds.
///
/// `p > 0.5` prices as a favourite (`-round(p/(1-p)*100)`); everything else,
/// including exactly 0.5, prices as an underdog (`+round((1/p-1)*100)`), so a
/// coin flip is `+100`.
pub fn probability_to_american_odds(p: f64) -> AmericanOdds {
    if !(p > 0.0 && p < 1.0) {
        return AmericanOdds::Infinite;
    }
    if p > 0.5 {
        AmericanOdds::Line(-((p / (1.0 - p)) * 100.0).round() as i64)
    } else {
        AmericanOdds::Line(((1.0 / p - 1.0) * 100.0).round() as i64)
    }
}

/// Rescale a two-way market so it sums to `total_overround`, keeping the
/// ratio between the sides.
pub fn apply_vig(p1: f64, p2: f64, total_overround: f64) -> Result<(f64, f64), OddsError> {
    let sum = p1 + p2;
    if !sum.is_finite() || sum <= 0.0 {
        return Err(OddsError::DegenerateInput(sum));
    }
    let scale = total_overround / sum;
    Ok((p1 * scale, p2 * scale))
}

/// Render odds with an explicit sign; the infinite sentinel passes through.
pub fn format_odds(odds: AmericanOdds) -> String {
    odds.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Implied probability of American odds. `Infinite` maps to 0.
    fn american_odds_to_probability(odds: AmericanOdds) -> f64 {
        match odds {
            AmericanOdds::Line(v) if v < 0 => {
                let v = v.unsigned_abs() as f64;
                v / (v + 100.0)
            }
            AmericanOdds::Line(v) => 100.0 / (v as f64 + 100.0),
            AmericanOdds::Infinite => 0.0,
        }
    }

    #[test]
    fn coin_flip_is_plus_one_hundred() {
        assert_eq!(probability_to_american_odds(0.5), AmericanOdds::Line(100));
        assert_eq!(format_odds(probability_to_american_odds(0.5)), "+100");
    }

    #[test]
    fn favourite_and_underdog_signs() {
        assert_eq!(probability_to_american_odds(0.75), AmericanOdds::Line(-300));
        assert_eq!(probability_to_american_odds(0.25), AmericanOdds::Line(300));
        assert_eq!(probability_to_american_odds(0.6), AmericanOdds::Line(-150));
        assert_eq!(probability_to_american_odds(0.4), AmericanOdds::Line(150));
    }

    #[test]
    fn extreme_probabilities_are_infinite() {
        for p in [0.0, 1.0, -0.2, 1.3, f64::NAN] {
            assert_eq!(probability_to_american_odds(p), AmericanOdds::Infinite);
        }
        assert_eq!(format_odds(AmericanOdds::Infinite), "∞");
    }

    #[test]
    fn near_certain_favourite_saturates_without_overflow() {
        let odds = probability_to_american_odds(1.0 - 1e-17);
        assert_eq!(odds, AmericanOdds::Infinite);
        let odds = probability_to_american_odds(1.0 - f64::EPSILON);
        assert!(matches!(odds, AmericanOdds::Line(v) if v < 0));
        assert!(american_odds_to_probability(odds) > 0.999);
        assert!(american_odds_to_probability(AmericanOdds::Line(i64::MIN)) > 0.999);
    }

    #[test]
    fn implied_probability_round_trip() {
        let mut p = 0.02;
        while p < 0.99 {
            let back = american_odds_to_probability(probability_to_american_odds(p));
            assert!((back - p).abs() < 0.01, "p={} back={}", p, back);
            p += 0.01;
        }
    }

    #[test]
    fn vig_sums_to_overround() {
        for p in [0.1, 0.35, 0.5, 0.72, 0.99] {
            let (a, b) = apply_vig(p, 1.0 - p, DEFAULT_OVERROUND).unwrap();
            assert_relative_eq!(a + b, 1.05, epsilon = 1e-12);
            assert_relative_eq!(a / b, p / (1.0 - p), epsilon = 1e-9);
        }
    }

    #[test]
    fn vig_on_zero_pair_is_degenerate() {
        assert_eq!(
            apply_vig(0.0, 0.0, DEFAULT_OVERROUND),
            Err(OddsError::DegenerateInput(0.0))
        );
    }

    #[test]
    fn formats_with_sign() {
        assert_eq!(format_odds(AmericanOdds::Line(-150)), "-150");
        assert_eq!(format_odds(AmericanOdds::Line(250)), "+250");
        assert_eq!(serde_json::to_string(&AmericanOdds::Line(250)).unwrap(), "\"+250\"");
    }
}
