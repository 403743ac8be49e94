//! ATP point-in-time feature engineering
//!
//! Turns a history of raw match box scores into a leakage-free feature table:
//! every statistic attached to a match reflects only matches played before it.

pub mod data;
pub mod features;
pub mod pipeline;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identity a player is tracked under (display name or source id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Court surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Surface {
    Clay,
    Grass,
    Hard,
    Carpet,
}

impl Surface {
    /// All surfaces in output column order
    pub const ALL: [Surface; 4] = [Surface::Clay, Surface::Grass, Surface::Hard, Surface::Carpet];

    pub fn name(&self) -> &'static str {
        match self {
            Surface::Clay => "Clay",
            Surface::Grass => "Grass",
            Surface::Hard => "Hard",
            Surface::Carpet => "Carpet",
        }
    }

    /// Lowercase form used in column names
    pub fn column(&self) -> &'static str {
        match self {
            Surface::Clay => "clay",
            Surface::Grass => "grass",
            Surface::Hard => "hard",
            Surface::Carpet => "carpet",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Surface::Clay => 0,
            Surface::Grass => 1,
            Surface::Hard => 2,
            Surface::Carpet => 3,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "clay" => Some(Surface::Clay),
            "grass" => Some(Surface::Grass),
            "hard" => Some(Surface::Hard),
            "carpet" => Some(Surface::Carpet),
            _ => None,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tournament round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    Final,
    SemiFinal,
    QuarterFinal,
    Round16,
    Round32,
    Round64,
    Round128,
    RoundRobin,
    BronzeMedal,
    /// Qualifying rounds, missing codes and anything else
    Other,
}

impl Round {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "F" => Round::Final,
            "SF" => Round::SemiFinal,
            "QF" => Round::QuarterFinal,
            "R16" => Round::Round16,
            "R32" => Round::Round32,
            "R64" => Round::Round64,
            "R128" => Round::Round128,
            "RR" => Round::RoundRobin,
            "BR" => Round::BronzeMedal,
            _ => Round::Other,
        }
    }
}

/// Match counters recorded for one player in one match.
///
/// Any counter may be missing from the source; missing counters contribute
/// zero to accumulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCounters {
    pub aces: Option<f64>,
    pub double_faults: Option<f64>,
    pub serve_points: Option<f64>,
    pub first_serves_in: Option<f64>,
    pub service_games: Option<f64>,
    pub break_points_saved: Option<f64>,
    pub break_points_faced: Option<f64>,
}

/// Converts a nullable source counter into an accumulation count
pub fn count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

/// One side of a match (winner or loser)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub id: Option<String>,
    pub seed: Option<f64>,
    pub height_cm: Option<f64>,
    pub country_code: Option<String>,
    pub age_years: Option<f64>,
    pub rank: Option<f64>,
    pub atp_points: Option<f64>,
    pub counters: MatchCounters,
}

impl PlayerEntry {
    pub fn named(name: &str) -> Self {
        PlayerEntry {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Resolve the accumulator identity for this player
    pub fn identity(&self, key: IdentityKey) -> Option<PlayerId> {
        let raw = match key {
            IdentityKey::Name => Some(self.name.as_str()),
            IdentityKey::Id => self.id.as_deref(),
        };
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PlayerId::new)
    }
}

/// A single completed match in canonical form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub match_number: i64,
    pub tournament_name: Option<String>,
    pub surface: Option<Surface>,
    pub round: Round,
    pub score: Option<String>,
    pub winner: PlayerEntry,
    pub loser: PlayerEntry,
}

impl MatchRecord {
    /// Minimal record, mostly for tests and fixtures
    pub fn new(date: NaiveDate, match_number: i64, winner: &str, loser: &str) -> Self {
        MatchRecord {
            date,
            match_number,
            tournament_name: None,
            surface: None,
            round: Round::Other,
            score: None,
            winner: PlayerEntry::named(winner),
            loser: PlayerEntry::named(loser),
        }
    }

    /// Calendar year used for year-to-date accumulators
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum TennisError {
    #[error("No match records in input")]
    EmptyInput,

    #[error("Required column missing from input: {0}")]
    MissingColumn(String),

    #[error("Row {row}: required field `{field}` is empty")]
    MissingField { row: usize, field: String },

    #[error("Row {row}: invalid tournament date `{value}`")]
    InvalidDate { row: usize, value: String },

    #[error("Player not found: {0}")]
    UnknownPlayer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TennisError>;

/// Which source field players are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    /// Display name. Distinct players sharing a name are merged.
    #[default]
    Name,
    /// Source player id
    Id,
}

/// How tiebreak sets found in the score are credited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiebreakAttribution {
    /// Match winner is credited with every tiebreak set, 7-6 and 6-7 alike.
    /// This is the historical behaviour of the feature table.
    #[default]
    WinnerAll,
    /// Each tiebreak goes to the player who took the set 7-6
    SetWinner,
}

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub engine: EngineConfig,
    pub derived: DerivedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub input_path: String,
    pub output_path: String,
    pub database_path: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub identity: IdentityKey,
    #[serde(default)]
    pub tiebreak_attribution: TiebreakAttribution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedConfig {
    /// Seed substituted for unseeded players in `seed_diff`
    pub missing_seed: f64,
    /// Country code -> tournament name keywords for the home flag
    pub home_keywords: BTreeMap<String, Vec<String>>,
}

impl Default for DerivedConfig {
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("AUS", &["Australian", "Brisbane", "Sydney", "Melbourne", "Adelaide"]),
            (
                "USA",
                &[
                    "US Open",
                    "Indian Wells",
                    "Miami",
                    "Cincinnati",
                    "Washington",
                    "Atlanta",
                    "Houston",
                    "Newport",
                    "San Diego",
                    "Los Angeles",
                    "Las Vegas",
                ],
            ),
            (
                "FRA",
                &["French Open", "Roland Garros", "Paris", "Lyon", "Marseille", "Montpellier", "Metz"],
            ),
            (
                "GBR",
                &["Wimbledon", "London", "Queens", "Eastbourne", "Birmingham", "Nottingham"],
            ),
            ("ESP", &["Madrid", "Barcelona", "Valencia", "Mallorca"]),
            ("ITA", &["Rome", "Italian Open", "Milan", "Florence"]),
            ("GER", &["Hamburg", "Munich", "Halle", "Stuttgart"]),
            ("CHN", &["Shanghai", "Beijing", "Shenzhen"]),
            ("JPN", &["Tokyo", "Japan Open"]),
            ("CAN", &["Montreal", "Toronto", "Rogers Cup", "Canada"]),
            ("NED", &["Rotterdam", "Netherlands"]),
            ("SUI", &["Basel", "Geneva"]),
            ("BRA", &["Rio", "Sao Paulo", "Brazil"]),
            ("ARG", &["Buenos Aires", "Argentina"]),
            ("RSA", &["South Africa"]),
            ("SWE", &["Stockholm", "Sweden"]),
            ("AUT", &["Vienna", "Austria"]),
        ];

        DerivedConfig {
            missing_seed: 999.0,
            home_keywords: table
                .iter()
                .map(|(country, words)| {
                    (
                        country.to_string(),
                        words.iter().map(|w| w.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                input_path: "parsed_data/03_atp_matches.csv".to_string(),
                output_path: "parsed_data/06_atp_matches.csv".to_string(),
                database_path: "data/tennis.db".to_string(),
            },
            engine: EngineConfig::default(),
            derived: DerivedConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TennisError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| TennisError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TennisError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_from_name() {
        assert_eq!(Surface::from_name("Clay"), Some(Surface::Clay));
        assert_eq!(Surface::from_name(" hard "), Some(Surface::Hard));
        assert_eq!(Surface::from_name("CARPET"), Some(Surface::Carpet));
        assert_eq!(Surface::from_name(""), None);
        assert_eq!(Surface::from_name("Sand"), None);
    }

    #[test]
    fn test_surface_index_matches_all() {
        for (i, surface) in Surface::ALL.iter().enumerate() {
            assert_eq!(surface.index(), i);
        }
    }

    #[test]
    fn test_round_codes() {
        assert_eq!(Round::from_code("F"), Round::Final);
        assert_eq!(Round::from_code("r128"), Round::Round128);
        assert_eq!(Round::from_code("RR"), Round::RoundRobin);
        assert_eq!(Round::from_code("Q2"), Round::Other);
        assert_eq!(Round::from_code(""), Round::Other);
    }

    #[test]
    fn test_count_missing_and_float_values() {
        assert_eq!(count(None), 0);
        assert_eq!(count(Some(12.0)), 12);
        assert_eq!(count(Some(-3.0)), 0);
        assert_eq!(count(Some(f64::NAN)), 0);
    }

    #[test]
    fn test_identity_resolution() {
        let mut entry = PlayerEntry::named("Roger Federer");
        assert_eq!(
            entry.identity(IdentityKey::Name),
            Some(PlayerId::new("Roger Federer"))
        );
        assert_eq!(entry.identity(IdentityKey::Id), None);

        entry.id = Some("103819".to_string());
        assert_eq!(entry.identity(IdentityKey::Id), Some(PlayerId::new("103819")));
    }

    #[test]
    fn test_config_toml_roundtrip_keeps_keywords() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.derived.home_keywords.len(), 17);
        assert_eq!(parsed.engine.identity, IdentityKey::Name);
        assert_eq!(
            parsed.engine.tiebreak_attribution,
            TiebreakAttribution::WinnerAll
        );
    }

    #[test]
    fn test_engine_config_defaults_when_omitted() {
        let text = r#"
            [data]
            input_path = "in.csv"
            output_path = "out.csv"
            database_path = "t.db"

            [engine]

            [derived]
            missing_seed = 999.0

            [derived.home_keywords]
            AUS = ["Melbourne"]
        "#;
        let parsed: Config = toml::from_str(text).unwrap();
        assert_eq!(parsed.engine.identity, IdentityKey::Name);
        assert_eq!(parsed.derived.home_keywords["AUS"], vec!["Melbourne"]);
    }
}
