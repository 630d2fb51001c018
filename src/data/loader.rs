//! Match sheet ingestion.
//!
//! The sheet is the response table of the league's Google Form, exported as
//! CSV. Every surviving line becomes two mirrored [`TrainingRow`]s. Bad lines
//! are logged and skipped; only a missing column or an unreadable source
//! fails the load.

use chrono::{DateTime, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::time::Duration;
use tracing::{info, warn};

use super::models::{BreakSide, Inebriated, MatchRecord, TrainingSet, MAX_MARGIN};
use super::source::fetch_source;
use super::DataError;

pub const TIMESTAMP_COL: &str = "Timestamp";
pub const WINNER_COL: &str =
    "Winner First Name (Use actual names for consistency in data collection)";
// The form has two spaces after "Name" here; keep it byte-for-byte.
pub const LOSER_COL: &str =
    "Loser First Name  (Use actual names for consistency in data collection)";
pub const BREAK_SIDE_COL: &str = "Which side of the table did the winner break from?";
pub const MARGIN_COL: &str = "Balls left on table by loser";
pub const INEBRIATED_COL: &str = "Players Inebriated?";

const REQUIRED_COLUMNS: [&str; 6] = [
    WINNER_COL,
    LOSER_COL,
    BREAK_SIDE_COL,
    MARGIN_COL,
    INEBRIATED_COL,
    TIMESTAMP_COL,
];

/// Timestamp layouts seen in exported sheets, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Column positions of the required fields within a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    timestamp: usize,
    winner: usize,
    loser: usize,
    break_side: usize,
    margin: usize,
    inebriated: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, DataError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(*name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DataError::Schema { missing });
        }

        // All present, checked above.
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(ColumnIndex {
            timestamp: at(TIMESTAMP_COL),
            winner: at(WINNER_COL),
            loser: at(LOSER_COL),
            break_side: at(BREAK_SIDE_COL),
            margin: at(MARGIN_COL),
            inebriated: at(INEBRIATED_COL),
        })
    }
}

/// Fetch the sheet from `source` and build the mirrored training set.
pub async fn load_training_data(
    source: &str,
    timeout: Duration,
) -> Result<TrainingSet, DataError> {
    let bytes = fetch_source(source, timeout).await?;
    parse_training_data(&bytes)
}

/// Parse CSV bytes into mirrored training rows.
pub fn parse_training_data(bytes: &[u8]) -> Result<TrainingSet, DataError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| DataError::DataSource(format!("unreadable CSV header: {}", e)))?
        .clone();
    let columns = ColumnIndex::from_headers(&headers)?;

    let mut set = TrainingSet::default();
    let mut records_read = 0usize;

    for (i, result) in reader.records().enumerate() {
        records_read += 1;
        // Header is line 1
        let fallback_line = i as u64 + 2;
        let parsed = match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                parse_record(&record, &columns, line)
            }
            Err(e) => Err(DataError::RowParse {
                line: e.position().map(|p| p.line()).unwrap_or(fallback_line),
                reason: e.to_string(),
            }),
        };

        match parsed {
            Ok(record) => set.rows.extend(record.mirror()),
            Err(e) => {
                warn!("Skipping match sheet row: {}", e);
                set.skipped_rows += 1;
            }
        }
    }

    info!(
        "Loaded match sheet: {} records read, {} kept, {} skipped ({} training rows)",
        records_read,
        records_read - set.skipped_rows,
        set.skipped_rows,
        set.rows.len()
    );
    Ok(set)
}

fn parse_record(
    record: &StringRecord,
    columns: &ColumnIndex,
    line: u64,
) -> Result<MatchRecord, DataError> {
    let row_err = |reason: String| DataError::RowParse { line, reason };
    let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

    let raw_ts = field(columns.timestamp);
    let timestamp =
        parse_timestamp(raw_ts).ok_or_else(|| row_err(format!("bad timestamp '{}'", raw_ts)))?;

    let winner = field(columns.winner);
    if winner.is_empty() {
        return Err(row_err("missing winner".into()));
    }
    let loser = field(columns.loser);
    if loser.is_empty() {
        return Err(row_err("missing loser".into()));
    }
    if winner == loser {
        return Err(row_err(format!("'{}' listed as both winner and loser", winner)));
    }

    let raw_side = field(columns.break_side);
    let winner_break_side = BreakSide::parse(raw_side)
        .ok_or_else(|| row_err(format!("bad break side '{}'", raw_side)))?;

    let margin = parse_margin(field(columns.margin)).map_err(row_err)?;

    // Blank and unrecognised answers count as sober.
    let raw_inebriated = field(columns.inebriated);
    let inebriated = match Inebriated::parse(raw_inebriated) {
        Some(answer) => answer,
        None => {
            if !raw_inebriated.is_empty() {
                warn!(
                    "line {}: unrecognised inebriated answer '{}', treating as No",
                    line, raw_inebriated
                );
            }
            Inebriated::No
        }
    };

    Ok(MatchRecord {
        winner: winner.to_string(),
        loser: loser.to_string(),
        winner_break_side,
        margin,
        inebriated,
        timestamp,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Balls left on the table, as a whole number in [0, 5].
pub fn parse_margin(raw: &str) -> Result<u8, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("non-numeric margin '{}'", raw))?;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(format!("margin '{}' is not a whole number", raw));
    }
    if !(0.0..=f64::from(MAX_MARGIN)).contains(&value) {
        return Err(format!("margin {} outside 0–5", value));
    }
    Ok(value as u8)
}
