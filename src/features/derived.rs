//! Derived match features
//!
//! Differentials, flags and round importance computed from a record and its
//! pre-match snapshot alone. No accumulator access, so records can be
//! processed in any order or in parallel.

use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::features::engine::MatchSnapshot;
use crate::{DerivedConfig, MatchRecord, Round};

/// Importance of a round: F=7 down to R128=1, RR=3, BR=1, anything else 1
pub fn round_importance(round: Round) -> u8 {
    match round {
        Round::Final => 7,
        Round::SemiFinal => 6,
        Round::QuarterFinal => 5,
        Round::Round16 => 4,
        Round::Round32 => 3,
        Round::Round64 => 2,
        Round::Round128 => 1,
        Round::RoundRobin => 3,
        Round::BronzeMedal => 1,
        Round::Other => 1,
    }
}

/// Country -> tournament keyword lookup for the home flag
#[derive(Debug, Clone, Default)]
pub struct HomeAdvantage {
    /// Upper-case country code -> lower-case keywords
    keywords: BTreeMap<String, Vec<String>>,
}

impl HomeAdvantage {
    pub fn new(table: &BTreeMap<String, Vec<String>>) -> Self {
        HomeAdvantage {
            keywords: table
                .iter()
                .map(|(country, words)| {
                    (
                        country.trim().to_uppercase(),
                        words.iter().map(|w| w.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// True if any keyword of `country` appears in the tournament name
    pub fn is_home(&self, country: Option<&str>, tournament: Option<&str>) -> bool {
        let (Some(country), Some(tournament)) = (country, tournament) else {
            return false;
        };
        let Some(words) = self.keywords.get(&country.trim().to_uppercase()) else {
            return false;
        };
        let name = tournament.to_lowercase();
        words.iter().any(|w| name.contains(w.as_str()))
    }
}

/// Derived features for one match
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedFeatures {
    /// Loser rank minus winner rank
    pub rank_diff: Option<f64>,
    pub winner_is_home: bool,
    pub loser_is_home: bool,
    pub height_diff_cm: Option<f64>,
    pub age_diff_years: Option<f64>,
    pub atp_points_diff: Option<f64>,
    pub experience_diff: i64,
    pub momentum_last5: i64,
    pub momentum_last10: i64,
    pub h2h_diff: i64,
    pub ytd_win_pct_diff: f64,
    /// On the match surface; 0.0 when the surface is unknown
    pub surface_win_pct_diff: f64,
    pub seed_diff: f64,
    /// Winner held the numerically worse rank
    pub is_upset: bool,
    pub round_importance: u8,
}

fn diff(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a - b),
        _ => None,
    }
}

/// Stateless calculator for `DerivedFeatures`
#[derive(Debug, Clone)]
pub struct DerivedCalculator {
    home: HomeAdvantage,
    missing_seed: f64,
}

impl DerivedCalculator {
    pub fn new(config: &DerivedConfig) -> Self {
        DerivedCalculator {
            home: HomeAdvantage::new(&config.home_keywords),
            missing_seed: config.missing_seed,
        }
    }

    pub fn compute(&self, record: &MatchRecord, snapshot: &MatchSnapshot) -> DerivedFeatures {
        let (w, l) = (&record.winner, &record.loser);
        let (ws, ls) = (&snapshot.winner, &snapshot.loser);
        let tournament = record.tournament_name.as_deref();

        let surface_win_pct_diff = record
            .surface
            .map(|s| ws.surface(s).win_pct - ls.surface(s).win_pct)
            .unwrap_or(0.0);

        let is_upset = matches!((w.rank, l.rank), (Some(wr), Some(lr)) if wr > lr);

        DerivedFeatures {
            rank_diff: diff(l.rank, w.rank),
            winner_is_home: self.home.is_home(w.country_code.as_deref(), tournament),
            loser_is_home: self.home.is_home(l.country_code.as_deref(), tournament),
            height_diff_cm: diff(w.height_cm, l.height_cm),
            age_diff_years: diff(w.age_years, l.age_years),
            atp_points_diff: diff(w.atp_points, l.atp_points),
            experience_diff: ws.career_matches as i64 - ls.career_matches as i64,
            momentum_last5: ws.last5_wins as i64 - ls.last5_wins as i64,
            momentum_last10: ws.last10_wins as i64 - ls.last10_wins as i64,
            h2h_diff: ws.h2h_wins as i64 - ls.h2h_wins as i64,
            ytd_win_pct_diff: ws.ytd.win_pct - ls.ytd.win_pct,
            surface_win_pct_diff,
            seed_diff: l.seed.unwrap_or(self.missing_seed) - w.seed.unwrap_or(self.missing_seed),
            is_upset,
            round_importance: round_importance(record.round),
        }
    }

    /// Compute for every (record, snapshot) pair, preserving order
    pub fn compute_all(&self, rows: &[(&MatchRecord, MatchSnapshot)]) -> Vec<DerivedFeatures> {
        rows.par_iter()
            .map(|(record, snapshot)| self.compute(record, snapshot))
            .collect()
    }
}
