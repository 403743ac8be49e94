//! CSV input and output
//!
//! Reads canonical match records while keeping every input column for
//! pass-through, and writes the finished feature table.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::features::table::FeatureTable;
use crate::{MatchCounters, MatchRecord, PlayerEntry, Result, Round, Surface, TennisError};

/// Columns a file must have for the pass to run at all
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "tournament_date",
    "match_number",
    "winner_player_name",
    "loser_player_name",
];

/// One CSV row as read. Stat columns that fail to parse read as missing.
#[derive(Debug, Deserialize)]
struct CsvMatchRow {
    tournament_date: Option<String>,
    match_number: Option<String>,
    #[serde(default)]
    tournament_name: Option<String>,
    #[serde(default)]
    court_surface: Option<String>,
    #[serde(default)]
    tournament_round: Option<String>,
    #[serde(default)]
    final_score: Option<String>,

    winner_player_name: Option<String>,
    #[serde(default)]
    winner_player_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_tournament_seed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_height_cm: Option<f64>,
    #[serde(default)]
    winner_country_code: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_age_years: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_atp_rank: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_atp_points: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_aces: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_double_faults: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_serve_points_total: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_first_serves_in: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_service_games: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_break_points_saved: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    winner_break_points_faced: Option<f64>,

    loser_player_name: Option<String>,
    #[serde(default)]
    loser_player_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_tournament_seed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_height_cm: Option<f64>,
    #[serde(default)]
    loser_country_code: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_age_years: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_atp_rank: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_atp_points: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_aces: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_double_faults: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_serve_points_total: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_first_serves_in: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_service_games: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_break_points_saved: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loser_break_points_faced: Option<f64>,
}

fn required(value: Option<String>, row: usize, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TennisError::MissingField {
            row,
            field: field.to_string(),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a YYYYMMDD date, tolerating a float rendering such as `20200106.0`
pub fn parse_tournament_date(value: &str) -> Option<NaiveDate> {
    let digits = value.trim();
    let digits = digits.strip_suffix(".0").unwrap_or(digits);
    if digits.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

impl CsvMatchRow {
    fn into_record(self, row: usize) -> Result<MatchRecord> {
        let date_text = required(self.tournament_date, row, "tournament_date")?;
        let date = parse_tournament_date(&date_text).ok_or(TennisError::InvalidDate {
            row,
            value: date_text.clone(),
        })?;

        let number_text = required(self.match_number, row, "match_number")?;
        let match_number = number_text
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
            .ok_or_else(|| {
                TennisError::Parse(format!("Row {}: invalid match_number `{}`", row, number_text))
            })?;

        let winner = PlayerEntry {
            name: required(self.winner_player_name, row, "winner_player_name")?,
            id: non_empty(self.winner_player_id),
            seed: self.winner_tournament_seed,
            height_cm: self.winner_height_cm,
            country_code: non_empty(self.winner_country_code),
            age_years: self.winner_age_years,
            rank: self.winner_atp_rank,
            atp_points: self.winner_atp_points,
            counters: MatchCounters {
                aces: self.winner_aces,
                double_faults: self.winner_double_faults,
                serve_points: self.winner_serve_points_total,
                first_serves_in: self.winner_first_serves_in,
                service_games: self.winner_service_games,
                break_points_saved: self.winner_break_points_saved,
                break_points_faced: self.winner_break_points_faced,
            },
        };

        let loser = PlayerEntry {
            name: required(self.loser_player_name, row, "loser_player_name")?,
            id: non_empty(self.loser_player_id),
            seed: self.loser_tournament_seed,
            height_cm: self.loser_height_cm,
            country_code: non_empty(self.loser_country_code),
            age_years: self.loser_age_years,
            rank: self.loser_atp_rank,
            atp_points: self.loser_atp_points,
            counters: MatchCounters {
                aces: self.loser_aces,
                double_faults: self.loser_double_faults,
                serve_points: self.loser_serve_points_total,
                first_serves_in: self.loser_first_serves_in,
                service_games: self.loser_service_games,
                break_points_saved: self.loser_break_points_saved,
                break_points_faced: self.loser_break_points_faced,
            },
        };

        Ok(MatchRecord {
            date,
            match_number,
            tournament_name: non_empty(self.tournament_name),
            surface: self.court_surface.as_deref().and_then(Surface::from_name),
            round: self
                .tournament_round
                .as_deref()
                .map(Round::from_code)
                .unwrap_or(Round::Other),
            score: non_empty(self.final_score),
            winner,
            loser,
        })
    }
}

/// Parsed records alongside the untouched input columns
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    pub headers: Vec<String>,
    pub records: Vec<MatchRecord>,
    /// Raw cells per record, aligned with `headers`
    pub raw: Vec<Vec<String>>,
}

impl MatchTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read match records from any CSV source
pub fn read_matches<R: Read>(source: R) -> Result<MatchTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(TennisError::MissingColumn(column.to_string()));
        }
    }

    let mut table = MatchTable {
        headers: headers.iter().map(String::from).collect(),
        ..Default::default()
    };

    for (i, result) in reader.records().enumerate() {
        let raw = result?;
        let row: CsvMatchRow = raw.deserialize(Some(&headers))?;
        table.records.push(row.into_record(i + 1)?);
        table.raw.push(raw.iter().map(String::from).collect());
    }

    Ok(table)
}

/// Load match records from a CSV file
pub fn load_matches<P: AsRef<Path>>(path: P) -> Result<MatchTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        TennisError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    let table = read_matches(file)?;
    log::info!(
        "Loaded {} matches with {} columns from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Write a feature table to any sink
pub fn write_table<W: Write>(table: &FeatureTable, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write a feature table to `path`.
///
/// Rows go to a sibling `.partial` file that replaces `path` only once
/// everything is written, so a failed write never leaves a truncated table.
pub fn save_feature_table<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(path);
    let written = File::create(&partial)
        .map_err(TennisError::from)
        .and_then(|file| write_table(table, file));

    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::rename(&partial, path)?;
    log::info!(
        "Saved {} rows x {} columns to {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(())
}
