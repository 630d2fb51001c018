use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of the table a player breaks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakSide {
    #[serde(rename = "Window Side")]
    WindowSide,
    #[serde(rename = "TV Side")]
    TvSide,
}

impl BreakSide {
    /// The two players in a match always break from opposite sides.
    pub fn opposite(self) -> Self {
        match self {
            BreakSide::WindowSide => BreakSide::TvSide,
            BreakSide::TvSide => BreakSide::WindowSide,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BreakSide::WindowSide => "Window Side",
            BreakSide::TvSide => "TV Side",
        }
    }

    /// Lenient parse used for form answers and CLI flags.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "window side" | "window" => Some(BreakSide::WindowSide),
            "tv side" | "tv" => Some(BreakSide::TvSide),
            _ => None,
        }
    }
}

impl fmt::Display for BreakSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreakSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BreakSide::parse(s).ok_or_else(|| format!("unknown break side '{}'", s))
    }
}

/// Free-function form of [`BreakSide::opposite`].
pub fn opposite_side(side: BreakSide) -> BreakSide {
    side.opposite()
}

/// Largest possible margin: all five of the loser's balls still on the table.
pub const MAX_MARGIN: u8 = 5;

/// Whether the players had been drinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inebriated {
    Yes,
    No,
}

impl Inebriated {
    pub fn as_str(&self) -> &'static str {
        match self {
            Inebriated::Yes => "Yes",
            Inebriated::No => "No",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" => Some(Inebriated::Yes),
            "no" | "n" | "false" => Some(Inebriated::No),
            _ => None,
        }
    }
}

impl fmt::Display for Inebriated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Inebriated {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Inebriated::parse(s).ok_or_else(|| format!("expected Yes or No, got '{}'", s))
    }
}

/// One validated line of the match sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub winner: String,
    pub loser: String,
    /// Side the winner broke from
    pub winner_break_side: BreakSide,
    /// Balls the loser still had on the table (0–5)
    pub margin: u8,
    pub inebriated: Inebriated,
    pub timestamp: NaiveDateTime,
}

impl MatchRecord {
    /// Expand the match into the winner's and the loser's perspective.
    ///
    /// The second row is the mirror of the first: players and break sides
    /// swapped, margin negated, outcome flipped.
    pub fn mirror(&self) -> [TrainingRow; 2] {
        let hour_of_day = self.timestamp.hour();
        let day_of_week = self.timestamp.weekday();
        let margin = i32::from(self.margin);

        let winner_view = TrainingRow {
            features: FeatureRow {
                player_a: self.winner.clone(),
                player_b: self.loser.clone(),
                break_side_a: self.winner_break_side,
                break_side_b: self.winner_break_side.opposite(),
                inebriated: self.inebriated,
                hour_of_day,
                day_of_week,
            },
            margin,
            won: true,
        };
        let loser_view = TrainingRow {
            features: FeatureRow {
                player_a: self.loser.clone(),
                player_b: self.winner.clone(),
                break_side_a: self.winner_break_side.opposite(),
                break_side_b: self.winner_break_side,
                inebriated: self.inebriated,
                hour_of_day,
                day_of_week,
            },
            margin: -margin,
            won: false,
        };
        [winner_view, loser_view]
    }
}

/// Model inputs, from playerA's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub player_a: String,
    pub player_b: String,
    pub break_side_a: BreakSide,
    pub break_side_b: BreakSide,
    pub inebriated: Inebriated,
    /// 0–23
    pub hour_of_day: u32,
    pub day_of_week: Weekday,
}

impl FeatureRow {
    /// Build an inference row for a match starting at `at`.
    pub fn for_matchup(
        player_a: &str,
        player_b: &str,
        break_side_a: BreakSide,
        inebriated: Inebriated,
        at: NaiveDateTime,
    ) -> Self {
        FeatureRow {
            player_a: player_a.to_string(),
            player_b: player_b.to_string(),
            break_side_a,
            break_side_b: opposite_side(break_side_a),
            inebriated,
            hour_of_day: at.hour(),
            day_of_week: at.weekday(),
        }
    }

    /// Categorical values in encoder column order.
    pub fn categorical_values(&self) -> [&str; 6] {
        [
            self.player_a.as_str(),
            self.player_b.as_str(),
            self.break_side_a.as_str(),
            self.break_side_b.as_str(),
            self.inebriated.as_str(),
            weekday_name(self.day_of_week),
        ]
    }
}

/// A training example: features plus both targets.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub features: FeatureRow,
    /// Positive when playerA won; magnitude is the loser's balls left.
    pub margin: i32,
    /// Classifier label: did playerA win
    pub won: bool,
}

impl TrainingRow {
    pub fn label(&self) -> f64 {
        if self.won {
            1.0
        } else {
            0.0
        }
    }
}

/// Mirrored rows produced by one load of the match sheet.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub rows: Vec<TrainingRow>,
    /// Sheet lines dropped because they failed to parse
    pub skipped_rows: usize,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct player names, sorted.
    pub fn players(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.features.player_a.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
