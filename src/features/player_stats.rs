//! Per-player running aggregates
//!
//! Each type here is one accumulator cell. A cell starts at zero, only ever
//! grows within a pass, and exposes the percentages derived from it.

use chrono::NaiveDate;

use crate::features::store::{Accumulate, PairSide};

/// Round to two decimals, the precision of every emitted rate
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole * 100`, rounded. 0/0 is 0.0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// `part / whole`, rounded. 0/0 is 0.0.
pub fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64)
    }
}

/// Result of a match from one player's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn as_bit(&self) -> u8 {
        match self {
            Outcome::Win => 1,
            Outcome::Loss => 0,
        }
    }
}

/// Win/loss record (also used per surface)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

impl WinLoss {
    pub fn played(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win percentage (0-100)
    pub fn win_pct(&self) -> f64 {
        percentage(self.wins as u64, self.played() as u64)
    }
}

impl Accumulate for WinLoss {
    type Delta = Outcome;

    fn accumulate(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
        }
    }
}

pub type SurfaceRecord = WinLoss;

/// Break point and tiebreak tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressureTally {
    /// Break points saved while serving
    pub bp_saved: u64,
    pub bp_faced: u64,
    pub tb_won: u64,
    pub tb_played: u64,
}

impl PressureTally {
    pub fn bp_pct(&self) -> f64 {
        percentage(self.bp_saved, self.bp_faced)
    }

    pub fn tb_pct(&self) -> f64 {
        percentage(self.tb_won, self.tb_played)
    }

    /// Saturating: absurd source counters pin at `u64::MAX`
    fn add(&mut self, other: &PressureTally) {
        self.bp_saved = self.bp_saved.saturating_add(other.bp_saved);
        self.bp_faced = self.bp_faced.saturating_add(other.bp_faced);
        self.tb_won = self.tb_won.saturating_add(other.tb_won);
        self.tb_played = self.tb_played.saturating_add(other.tb_played);
    }
}

/// Year-to-date record for a (player, year)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearlyRecord {
    pub record: WinLoss,
    pub pressure: PressureTally,
}

#[derive(Debug, Clone, Copy)]
pub struct YearlyDelta {
    pub outcome: Outcome,
    pub pressure: PressureTally,
}

impl Accumulate for YearlyRecord {
    type Delta = YearlyDelta;

    fn accumulate(&mut self, delta: &YearlyDelta) {
        self.record.accumulate(&delta.outcome);
        self.pressure.add(&delta.pressure);
    }
}

/// Career-long pressure record for a player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CareerRecord {
    pub pressure: PressureTally,
}

impl Accumulate for CareerRecord {
    type Delta = PressureTally;

    fn accumulate(&mut self, delta: &PressureTally) {
        self.pressure.add(delta);
    }
}

/// Head-to-head wins, stored in canonical pair order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct H2HRecord {
    pub first_wins: u32,
    pub second_wins: u32,
}

impl H2HRecord {
    pub fn wins_for(&self, side: PairSide) -> u32 {
        match side {
            PairSide::First => self.first_wins,
            PairSide::Second => self.second_wins,
        }
    }
}

impl Accumulate for H2HRecord {
    /// Side of the pair that won
    type Delta = PairSide;

    fn accumulate(&mut self, winner: &PairSide) {
        match winner {
            PairSide::First => self.first_wins += 1,
            PairSide::Second => self.second_wins += 1,
        }
    }
}

/// Capacity of the recent-form ring
pub const FORM_CAPACITY: usize = 10;

/// Most recent outcomes for a player (1 = win, 0 = loss).
///
/// Keeps the last `FORM_CAPACITY` entries of the append-only outcome
/// sequence, which is all any window up to that size needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormWindow {
    ring: [u8; FORM_CAPACITY],
    /// Next write position
    head: usize,
    /// Entries held, saturating at capacity
    len: usize,
}

impl FormWindow {
    /// Wins among the last `n` outcomes (fewer if fewer were played)
    pub fn last_wins(&self, n: usize) -> u32 {
        let take = n.min(self.len);
        (1..=take)
            .map(|back| {
                let idx = (self.head + FORM_CAPACITY - back) % FORM_CAPACITY;
                self.ring[idx] as u32
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Outcomes oldest first
    pub fn outcomes(&self) -> Vec<u8> {
        (0..self.len)
            .rev()
            .map(|back| self.ring[(self.head + FORM_CAPACITY - 1 - back) % FORM_CAPACITY])
            .collect()
    }
}

impl Accumulate for FormWindow {
    type Delta = Outcome;

    fn accumulate(&mut self, outcome: &Outcome) {
        self.ring[self.head] = outcome.as_bit();
        self.head = (self.head + 1) % FORM_CAPACITY;
        self.len = (self.len + 1).min(FORM_CAPACITY);
    }
}

/// When a player last played and how often
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineRecord {
    pub last_date: Option<NaiveDate>,
    pub matches: u32,
}

impl TimelineRecord {
    /// Whole days since the previous match; `None` before the first one
    pub fn days_since(&self, date: NaiveDate) -> Option<i64> {
        self.last_date.map(|last| (date - last).num_days())
    }
}

impl Accumulate for TimelineRecord {
    type Delta = NaiveDate;

    fn accumulate(&mut self, date: &NaiveDate) {
        self.last_date = Some(*date);
        self.matches += 1;
    }
}

/// Cumulative serve counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeRecord {
    pub first_serves_in: u64,
    pub serve_points: u64,
    pub aces: u64,
    pub double_faults: u64,
    pub service_games: u64,
}

impl ServeRecord {
    /// First serves in as a percentage of serve points
    pub fn first_serve_pct(&self) -> f64 {
        percentage(self.first_serves_in, self.serve_points)
    }

    pub fn aces_per_service_game(&self) -> f64 {
        rate(self.aces, self.service_games)
    }

    pub fn double_faults_per_service_game(&self) -> f64 {
        rate(self.double_faults, self.service_games)
    }
}

impl Accumulate for ServeRecord {
    type Delta = ServeRecord;

    fn accumulate(&mut self, delta: &ServeRecord) {
        self.first_serves_in = self.first_serves_in.saturating_add(delta.first_serves_in);
        self.serve_points = self.serve_points.saturating_add(delta.serve_points);
        self.aces = self.aces.saturating_add(delta.aces);
        self.double_faults = self.double_faults.saturating_add(delta.double_faults);
        self.service_games = self.service_games.saturating_add(delta.service_games);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_over_zero_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(rate(5, 0), 0.0);
        assert_eq!(WinLoss::default().win_pct(), 0.0);
        assert_eq!(PressureTally::default().bp_pct(), 0.0);
        assert_eq!(ServeRecord::default().first_serve_pct(), 0.0);
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(rate(7, 3), 2.33);
    }

    #[test]
    fn test_win_loss() {
        let mut record = WinLoss::default();
        record.accumulate(&Outcome::Win);
        record.accumulate(&Outcome::Win);
        record.accumulate(&Outcome::Loss);
        assert_eq!(record.wins, 2);
        assert_eq!(record.losses, 1);
        assert_eq!(record.win_pct(), 66.67);
    }

    #[test]
    fn test_yearly_record_adds_pressure() {
        let mut yearly = YearlyRecord::default();
        let delta = YearlyDelta {
            outcome: Outcome::Loss,
            pressure: PressureTally {
                bp_saved: 3,
                bp_faced: 5,
                tb_won: 0,
                tb_played: 1,
            },
        };
        yearly.accumulate(&delta);
        yearly.accumulate(&delta);

        assert_eq!(yearly.record.losses, 2);
        assert_eq!(yearly.pressure.bp_faced, 10);
        assert_eq!(yearly.pressure.bp_pct(), 60.0);
        assert_eq!(yearly.pressure.tb_pct(), 0.0);
    }

    #[test]
    fn test_h2h_sides() {
        let mut h2h = H2HRecord::default();
        h2h.accumulate(&PairSide::First);
        h2h.accumulate(&PairSide::First);
        h2h.accumulate(&PairSide::Second);
        assert_eq!(h2h.wins_for(PairSide::First), 2);
        assert_eq!(h2h.wins_for(PairSide::Second), 1);
    }

    #[test]
    fn test_form_window_suffix_sums() {
        let mut form = FormWindow::default();
        assert_eq!(form.last_wins(5), 0);

        // W W L W
        for outcome in [Outcome::Win, Outcome::Win, Outcome::Loss, Outcome::Win] {
            form.accumulate(&outcome);
        }
        assert_eq!(form.last_wins(5), 3);
        assert_eq!(form.last_wins(10), 3);
        assert_eq!(form.last_wins(2), 1);
        assert_eq!(form.outcomes(), vec![1, 1, 0, 1]);
    }

    #[test]
    fn test_form_window_matches_full_history() {
        // Compare the ring against the unbounded sequence over a long run
        let pattern = [1u8, 0, 0, 1, 1, 1, 0, 1, 0, 0, 1, 1, 0];
        let mut form = FormWindow::default();
        let mut history: Vec<u8> = Vec::new();

        for i in 0..40 {
            let bit = pattern[i % pattern.len()];
            for n in [5usize, 10] {
                let start = history.len().saturating_sub(n);
                let expected: u32 = history[start..].iter().map(|b| *b as u32).sum();
                assert_eq!(form.last_wins(n), expected, "step {} window {}", i, n);
            }
            let outcome = if bit == 1 { Outcome::Win } else { Outcome::Loss };
            form.accumulate(&outcome);
            history.push(bit);
        }
        assert_eq!(form.len(), FORM_CAPACITY);
    }

    #[test]
    fn test_timeline_days_since() {
        let mut timeline = TimelineRecord::default();
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();

        assert_eq!(timeline.days_since(d1), None);
        timeline.accumulate(&d1);
        assert_eq!(timeline.days_since(d2), Some(31));
        assert_eq!(timeline.days_since(d1), Some(0));
        assert_eq!(timeline.matches, 1);
    }

    #[test]
    fn test_serve_rates() {
        let mut serve = ServeRecord::default();
        serve.accumulate(&ServeRecord {
            first_serves_in: 40,
            serve_points: 64,
            aces: 9,
            double_faults: 2,
            service_games: 10,
        });
        assert_eq!(serve.first_serve_pct(), 62.5);
        assert_eq!(serve.aces_per_service_game(), 0.9);
        assert_eq!(serve.double_faults_per_service_game(), 0.2);
    }

    #[test]
    fn test_absurd_counters_saturate() {
        let huge = crate::count(Some(1e20));
        assert_eq!(huge, u64::MAX);

        let mut career = CareerRecord::default();
        let delta = PressureTally {
            bp_saved: huge,
            bp_faced: huge,
            ..Default::default()
        };
        career.accumulate(&delta);
        career.accumulate(&delta);
        assert_eq!(career.pressure.bp_faced, u64::MAX);
        assert_eq!(career.pressure.bp_pct(), 100.0);

        let mut serve = ServeRecord::default();
        let game = ServeRecord {
            aces: huge,
            service_games: 10,
            ..Default::default()
        };
        serve.accumulate(&game);
        serve.accumulate(&game);
        assert_eq!(serve.aces, u64::MAX);
        assert_eq!(serve.service_games, 20);
    }
}
