//! Flat feature table
//!
//! Turns snapshots and derived features into named columns appended after
//! the pass-through input columns.

use crate::features::derived::DerivedFeatures;
use crate::features::engine::{MatchSnapshot, RatioSnapshot, SideSnapshot};
use crate::Surface;

/// One output cell before formatting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Flag(bool),
    Missing,
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            // Debug keeps the fraction on whole numbers ("50.0", not "50")
            Cell::Float(v) => format!("{:?}", v),
            Cell::Flag(b) => if *b { "1" } else { "0" }.to_string(),
            Cell::Missing => String::new(),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Float).unwrap_or(Cell::Missing)
    }
}

/// Ordered (name, cell) pairs for one record
#[derive(Debug, Default)]
pub struct Columns {
    entries: Vec<(String, Cell)>,
}

impl Columns {
    fn push(&mut self, name: impl Into<String>, cell: Cell) {
        self.entries.push((name.into(), cell));
    }

    fn int(&mut self, name: impl Into<String>, v: impl Into<i64>) {
        self.push(name, Cell::Int(v.into()));
    }

    fn count(&mut self, name: impl Into<String>, v: u64) {
        self.push(name, Cell::Int(v as i64));
    }

    fn float(&mut self, name: impl Into<String>, v: f64) {
        self.push(name, Cell::Float(v));
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn cells(&self) -> Vec<String> {
        self.entries.iter().map(|(_, c)| c.render()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Cell> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sides(snapshot: &MatchSnapshot) -> [(&'static str, &SideSnapshot); 2] {
    [("winner", &snapshot.winner), ("loser", &snapshot.loser)]
}

fn push_ratio(cols: &mut Columns, side: &str, stat: &str, total: &str, scope: &str, r: &RatioSnapshot) {
    cols.count(format!("{side}_{stat}_won_{scope}"), r.won);
    cols.count(format!("{side}_{stat}_{total}_{scope}"), r.total);
    cols.float(format!("{side}_{stat}_pct_{scope}"), r.pct);
}

/// Snapshot columns, grouped by statistic with winner before loser
pub fn snapshot_columns(snapshot: &MatchSnapshot, cols: &mut Columns) {
    for (side, s) in sides(snapshot) {
        cols.int(format!("{side}_wins_ytd"), s.ytd.wins);
        cols.int(format!("{side}_losses_ytd"), s.ytd.losses);
        cols.float(format!("{side}_win_pct_ytd"), s.ytd.win_pct);
    }

    for (side, s) in sides(snapshot) {
        cols.int(format!("{side}_h2h_wins"), s.h2h_wins);
        cols.int(format!("{side}_h2h_losses"), s.h2h_losses);
    }

    for (side, s) in sides(snapshot) {
        push_ratio(cols, side, "bp", "faced", "ytd", &s.bp_ytd);
        push_ratio(cols, side, "bp", "faced", "career", &s.bp_career);
    }

    for (side, s) in sides(snapshot) {
        push_ratio(cols, side, "tb", "played", "ytd", &s.tb_ytd);
        push_ratio(cols, side, "tb", "played", "career", &s.tb_career);
    }

    for (side, s) in sides(snapshot) {
        for surface in Surface::ALL {
            let r = s.surface(surface);
            let name = surface.column();
            cols.int(format!("{side}_{name}_wins"), r.wins);
            cols.int(format!("{side}_{name}_losses"), r.losses);
            cols.float(format!("{side}_{name}_win_pct"), r.win_pct);
        }
    }

    for (side, s) in sides(snapshot) {
        cols.int(format!("{side}_last5_wins"), s.last5_wins);
        cols.int(format!("{side}_last10_wins"), s.last10_wins);
    }

    for (side, s) in sides(snapshot) {
        let days = s.days_since_last_match.map(Cell::Int).unwrap_or(Cell::Missing);
        cols.push(format!("{side}_days_since_last_match"), days);
        cols.int(format!("{side}_career_matches"), s.career_matches);
    }

    for (side, s) in sides(snapshot) {
        cols.float(format!("{side}_first_serve_pct_career"), s.first_serve_pct_career);
        cols.float(format!("{side}_aces_per_service_game"), s.aces_per_service_game);
        cols.float(format!("{side}_df_per_service_game"), s.df_per_service_game);
    }
}

pub fn derived_columns(d: &DerivedFeatures, cols: &mut Columns) {
    cols.push("rank_diff", d.rank_diff.into());
    cols.push("winner_is_home", Cell::Flag(d.winner_is_home));
    cols.push("loser_is_home", Cell::Flag(d.loser_is_home));
    cols.push("height_diff_cm", d.height_diff_cm.into());
    cols.push("age_diff_years", d.age_diff_years.into());
    cols.push("atp_points_diff", d.atp_points_diff.into());
    cols.int("experience_diff", d.experience_diff);
    cols.int("momentum_last5", d.momentum_last5);
    cols.int("momentum_last10", d.momentum_last10);
    cols.int("h2h_diff", d.h2h_diff);
    cols.float("ytd_win_pct_diff", d.ytd_win_pct_diff);
    cols.float("surface_win_pct_diff", d.surface_win_pct_diff);
    cols.float("seed_diff", d.seed_diff);
    cols.push("is_upset", Cell::Flag(d.is_upset));
    cols.int("round_importance", d.round_importance);
}

/// All feature columns for one record
pub fn feature_columns(snapshot: &MatchSnapshot, derived: &DerivedFeatures) -> Columns {
    let mut cols = Columns::default();
    snapshot_columns(snapshot, &mut cols);
    derived_columns(derived, &mut cols);
    cols
}

/// Names of the feature columns, in output order
pub fn feature_headers() -> Vec<String> {
    feature_columns(&MatchSnapshot::default(), &DerivedFeatures::default()).names()
}

/// Input columns followed by feature columns, as rendered strings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FeatureTable {
    pub fn new(input_headers: &[String]) -> Self {
        let mut headers = input_headers.to_vec();
        headers.extend(feature_headers());
        FeatureTable {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, input: Vec<String>, features: &Columns) {
        let mut row = input;
        row.extend(features.cells());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell by row and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_header_names_are_unique() {
        let headers = feature_headers();
        let unique: HashSet<&String> = headers.iter().collect();
        assert_eq!(unique.len(), headers.len());
    }

    #[test]
    fn test_expected_columns_present() {
        let headers = feature_headers();
        for name in [
            "winner_wins_ytd",
            "loser_win_pct_ytd",
            "winner_h2h_losses",
            "winner_bp_won_ytd",
            "loser_bp_faced_career",
            "winner_tb_played_ytd",
            "loser_tb_pct_career",
            "winner_clay_win_pct",
            "loser_carpet_losses",
            "winner_last10_wins",
            "loser_days_since_last_match",
            "winner_career_matches",
            "loser_df_per_service_game",
            "rank_diff",
            "surface_win_pct_diff",
            "round_importance",
        ] {
            assert!(headers.iter().any(|h| h == name), "missing {}", name);
        }
        // 2 sides x 36 snapshot columns + 15 derived
        assert_eq!(headers.len(), 87);
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(Cell::Int(-3).render(), "-3");
        assert_eq!(Cell::Float(50.0).render(), "50.0");
        assert_eq!(Cell::Float(66.67).render(), "66.67");
        assert_eq!(Cell::Flag(true).render(), "1");
        assert_eq!(Cell::Missing.render(), "");
        assert_eq!(Cell::from(None::<f64>), Cell::Missing);
    }

    #[test]
    fn test_first_appearance_days_is_blank() {
        let cols = feature_columns(&MatchSnapshot::default(), &DerivedFeatures::default());
        assert_eq!(cols.get("winner_days_since_last_match"), Some(Cell::Missing));
        assert_eq!(cols.get("winner_career_matches"), Some(Cell::Int(0)));
        assert_eq!(cols.names().len(), cols.cells().len());
    }

    #[test]
    fn test_table_rows_line_up_with_headers() {
        let input = vec!["tournament_date".to_string(), "match_number".to_string()];
        let mut table = FeatureTable::new(&input);
        let cols = feature_columns(&MatchSnapshot::default(), &DerivedFeatures::default());
        table.push_row(vec!["20200101".to_string(), "1".to_string()], &cols);

        assert_eq!(table.rows[0].len(), table.headers.len());
        assert_eq!(table.value(0, "match_number"), Some("1"));
        assert_eq!(table.value(0, "winner_win_pct_ytd"), Some("0.0"));
        assert_eq!(table.value(0, "round_importance"), Some("0"));
    }
}
