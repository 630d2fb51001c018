//! Single-match prediction: one feature row, one call into each model, and
//! the odds sheet built from the two outputs.

use chrono::{Local, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::data::{BreakSide, FeatureRow, Inebriated};
use crate::model::ModelBundle;
use crate::odds::{
    apply_vig, margin_distribution, normal_cdf, probability_to_american_odds, sweep_odds,
    AmericanOdds, MarginOdds,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub player_a: String,
    pub player_b: String,
    /// Side playerA breaks from; playerB takes the other
    pub break_side: BreakSide,
    pub inebriated: Inebriated,
    pub apply_vig: bool,
}

/// One value per player, serialized as `{ "<name A>": a, "<name B>": b }`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerPlayer<T> {
    pub player_a: String,
    pub a: T,
    pub player_b: String,
    pub b: T,
}

impl<T> PerPlayer<T> {
    fn new(request: &PredictionRequest, a: T, b: T) -> Self {
        PerPlayer {
            player_a: request.player_a.clone(),
            a,
            player_b: request.player_b.clone(),
            b,
        }
    }
}

impl<T: Serialize> Serialize for PerPlayer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.player_a, &self.a)?;
        map.serialize_entry(&self.player_b, &self.b)?;
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Moneyline {
    #[serde(flatten)]
    pub odds: PerPlayer<AmericanOdds>,
    pub probabilities: PerPlayer<f64>,
}

/// Where the spread line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadSource {
    /// Past games between these two players
    Matchup,
    /// All past games of playerA
    PlayerHistory,
    /// No history; regressor mean with the normal margin model
    Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct Spread {
    #[serde(flatten)]
    pub odds: PerPlayer<AmericanOdds>,
    /// Handicap per player, betting convention (favourite negative)
    pub line: PerPlayer<f64>,
    pub probabilities: PerPlayer<f64>,
    pub source: SpreadSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictedMargin {
    pub winner: String,
    pub loser: String,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub moneyline: Moneyline,
    pub spread: Spread,
    pub sweep_odds: PerPlayer<AmericanOdds>,
    pub predicted_margin: PredictedMargin,
    /// Keyed by margin 1..=5
    pub margin_distribution: BTreeMap<u8, MarginOdds>,
}

/// Predict a match as if it started right now.
pub fn predict_match_now(
    bundle: &ModelBundle,
    request: &PredictionRequest,
    overround: f64,
) -> PredictionResult {
    predict_match(bundle, request, overround, Local::now().naive_local())
}

/// Predict a match starting at `at`.
pub fn predict_match(
    bundle: &ModelBundle,
    request: &PredictionRequest,
    overround: f64,
    at: NaiveDateTime,
) -> PredictionResult {
    let row = FeatureRow::for_matchup(
        &request.player_a,
        &request.player_b,
        request.break_side,
        request.inebriated,
        at,
    );
    let features = bundle.encode(&row);
    let p_a = bundle.win_probability(&features);
    let p_b = 1.0 - p_a;
    let raw_margin = bundle.expected_margin(&features);
    let sd = bundle.margin_std_dev;

    let a_wins = p_a >= p_b;
    let (winner, loser) = if a_wins {
        (&request.player_a, &request.player_b)
    } else {
        (&request.player_b, &request.player_a)
    };
    let magnitude = raw_margin.abs();
    let signed_margin_a = if a_wins { magnitude } else { -magnitude };

    debug!(
        "{} vs {}: p={:.4}, regressor margin {:.3}, σ={:.3}",
        request.player_a, request.player_b, p_a, raw_margin, sd
    );

    let (ml_a, ml_b) = maybe_vig(p_a, p_b, request.apply_vig, overround);
    let moneyline = Moneyline {
        odds: PerPlayer::new(
            request,
            probability_to_american_odds(ml_a),
            probability_to_american_odds(ml_b),
        ),
        probabilities: PerPlayer::new(request, round_to(ml_a, 4), round_to(ml_b, 4)),
    };

    let spread = spread_market(bundle, request, signed_margin_a, overround);

    let sweep = PerPlayer::new(
        request,
        sweep_odds(signed_margin_a, sd),
        sweep_odds(-signed_margin_a, sd),
    );

    let distribution = margin_distribution(magnitude, sd)
        .into_iter()
        .map(|mut bucket| {
            bucket.winner_probability = round_to(bucket.winner_probability, 4);
            bucket.loser_probability = round_to(bucket.loser_probability, 4);
            (bucket.margin, bucket)
        })
        .collect();

    PredictionResult {
        moneyline,
        spread,
        sweep_odds: sweep,
        predicted_margin: PredictedMargin {
            winner: winner.clone(),
            loser: loser.clone(),
            margin: round_to(magnitude, 2),
        },
        margin_distribution: distribution,
    }
}

/// Fair handicap and cover odds for playerA, from history when there is
/// any and from the margin model otherwise.
fn spread_market(
    bundle: &ModelBundle,
    request: &PredictionRequest,
    signed_margin_a: f64,
    overround: f64,
) -> Spread {
    let matchup = history_margins(bundle, &request.player_a, Some(request.player_b.as_str()));
    let (margins, source) = if !matchup.is_empty() {
        (matchup, SpreadSource::Matchup)
    } else {
        let own = history_margins(bundle, &request.player_a, None);
        if own.is_empty() {
            (own, SpreadSource::Model)
        } else {
            (own, SpreadSource::PlayerHistory)
        }
    };

    let (fair_spread, cover_a) = if margins.is_empty() {
        let line = round_to(signed_margin_a, 1);
        let cover = 1.0 - normal_cdf((line - signed_margin_a) / bundle.margin_std_dev);
        (line, cover)
    } else {
        let line = round_to(margins.iter().sum::<f64>() / margins.len() as f64, 1);
        let covered = margins.iter().filter(|m| **m > line).count();
        (line, covered as f64 / margins.len() as f64)
    };
    let cover_b = 1.0 - cover_a;

    let (sp_a, sp_b) = maybe_vig(cover_a, cover_b, request.apply_vig, overround);
    Spread {
        odds: PerPlayer::new(
            request,
            probability_to_american_odds(sp_a),
            probability_to_american_odds(sp_b),
        ),
        // + 0.0 turns a -0.0 line into 0.0
        line: PerPlayer::new(request, -fair_spread + 0.0, fair_spread + 0.0),
        probabilities: PerPlayer::new(request, round_to(sp_a, 4), round_to(sp_b, 4)),
        source,
    }
}

/// Signed margins of past rows with `player_a` as A (and `player_b` as B
/// when given).
fn history_margins(bundle: &ModelBundle, player_a: &str, player_b: Option<&str>) -> Vec<f64> {
    bundle
        .history
        .iter()
        .filter(|r| r.features.player_a == player_a)
        .filter(|r| player_b.map_or(true, |b| r.features.player_b == b))
        .map(|r| f64::from(r.margin))
        .collect()
}

fn maybe_vig(p1: f64, p2: f64, enabled: bool, overround: f64) -> (f64, f64) {
    if !enabled {
        return (p1, p2);
    }
    match apply_vig(p1, p2, overround) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("{}; pricing without vig", e);
            (p1, p2)
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
