//! Snapshot-update engine
//!
//! Walks matches in chronological order. For each match it first reads the
//! pre-match state of every accumulator for both players, then commits the
//! match's own contribution. Reads always happen before writes, so nothing a
//! match reports can depend on that match or any later one.

use chrono::NaiveDate;

use crate::features::player_stats::{
    Outcome, PressureTally, ServeRecord, WinLoss, YearlyDelta,
};
use crate::features::score::{ScoreSummary, TiebreakCount};
use crate::features::store::{AccumulatorStore, PairKey, PairSide, PlayerSurface, PlayerYear};
use crate::{
    count, EngineConfig, IdentityKey, MatchRecord, PlayerEntry, PlayerId, Result, Surface,
    TennisError, TiebreakAttribution,
};

/// Pre-match win/loss record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordSnapshot {
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
}

impl From<WinLoss> for RecordSnapshot {
    fn from(record: WinLoss) -> Self {
        RecordSnapshot {
            wins: record.wins,
            losses: record.losses,
            win_pct: record.win_pct(),
        }
    }
}

/// Pre-match success/attempt counts with their percentage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatioSnapshot {
    pub won: u64,
    pub total: u64,
    pub pct: f64,
}

impl RatioSnapshot {
    fn breakpoints(tally: &PressureTally) -> Self {
        RatioSnapshot {
            won: tally.bp_saved,
            total: tally.bp_faced,
            pct: tally.bp_pct(),
        }
    }

    fn tiebreaks(tally: &PressureTally) -> Self {
        RatioSnapshot {
            won: tally.tb_won,
            total: tally.tb_played,
            pct: tally.tb_pct(),
        }
    }
}

/// Everything known about one player strictly before a match
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideSnapshot {
    // === Year to date ===
    pub ytd: RecordSnapshot,
    pub bp_ytd: RatioSnapshot,
    pub tb_ytd: RatioSnapshot,

    // === Career ===
    pub bp_career: RatioSnapshot,
    pub tb_career: RatioSnapshot,

    // === Head to head against this opponent ===
    pub h2h_wins: u32,
    pub h2h_losses: u32,

    /// Indexed by `Surface::index`
    pub surfaces: [RecordSnapshot; 4],

    // === Recent form ===
    pub last5_wins: u32,
    pub last10_wins: u32,

    // === Fatigue and experience ===
    /// `None` on the player's first match
    pub days_since_last_match: Option<i64>,
    pub career_matches: u32,

    // === Serve ===
    pub first_serve_pct_career: f64,
    pub aces_per_service_game: f64,
    pub df_per_service_game: f64,
}

impl SideSnapshot {
    pub fn surface(&self, surface: Surface) -> &RecordSnapshot {
        &self.surfaces[surface.index()]
    }
}

/// Pre-match snapshots for both players
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchSnapshot {
    pub winner: SideSnapshot,
    pub loser: SideSnapshot,
}

/// Accumulator keys for one match
struct MatchKeys {
    winner: PlayerId,
    loser: PlayerId,
    year: i32,
    surface: Option<Surface>,
    pair: PairKey,
}

impl MatchKeys {
    fn resolve(row: usize, record: &MatchRecord, identity: IdentityKey) -> Result<Self> {
        let field = |side: &str| match identity {
            IdentityKey::Name => format!("{}_player_name", side),
            IdentityKey::Id => format!("{}_player_id", side),
        };
        let winner = record
            .winner
            .identity(identity)
            .ok_or_else(|| TennisError::MissingField {
                row,
                field: field("winner"),
            })?;
        let loser = record
            .loser
            .identity(identity)
            .ok_or_else(|| TennisError::MissingField {
                row,
                field: field("loser"),
            })?;
        let pair = PairKey::new(&winner, &loser);

        Ok(MatchKeys {
            winner,
            loser,
            year: record.year(),
            surface: record.surface,
            pair,
        })
    }
}

/// Counters from the pass so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub processed: usize,
    pub malformed_scores: usize,
    pub missing_surface: usize,
}

/// Sequential as-of feature engine
pub struct SnapshotEngine {
    store: AccumulatorStore,
    identity: IdentityKey,
    attribution: TiebreakAttribution,
    stats: EngineStats,
}

impl SnapshotEngine {
    /// Take ownership of `store` for the duration of a pass
    pub fn new(store: AccumulatorStore, config: EngineConfig) -> Self {
        SnapshotEngine {
            store,
            identity: config.identity,
            attribution: config.tiebreak_attribution,
            stats: EngineStats::default(),
        }
    }

    /// Snapshot one match, then fold it into the store.
    ///
    /// `row` is the record's 1-based input row, used only in errors.
    /// Records must be fed in sequencer order.
    pub fn process(&mut self, row: usize, record: &MatchRecord) -> Result<MatchSnapshot> {
        let keys = MatchKeys::resolve(row, record, self.identity)?;

        let snapshot = MatchSnapshot {
            winner: self.read_side(&keys.winner, &keys, record.date),
            loser: self.read_side(&keys.loser, &keys, record.date),
        };

        let tiebreaks = self.tiebreaks(record);
        self.commit(&keys, record, tiebreaks);
        self.stats.processed += 1;

        Ok(snapshot)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// End the pass and hand the store back
    pub fn into_store(self) -> AccumulatorStore {
        self.store
    }

    fn read_side(&self, player: &PlayerId, keys: &MatchKeys, date: NaiveDate) -> SideSnapshot {
        let store = &self.store;

        let yearly = store.yearly.get(&PlayerYear::new(player, keys.year));
        let career = store.career.get(player);
        let form = store.form.get(player);
        let timeline = store.timeline.get(player);
        let serve = store.serve.get(player);

        let h2h = store.h2h.get(&keys.pair);
        let side = keys.pair.side_of(player);
        let opponent_side = match side {
            PairSide::First => PairSide::Second,
            PairSide::Second => PairSide::First,
        };

        SideSnapshot {
            ytd: yearly.record.into(),
            bp_ytd: RatioSnapshot::breakpoints(&yearly.pressure),
            tb_ytd: RatioSnapshot::tiebreaks(&yearly.pressure),
            bp_career: RatioSnapshot::breakpoints(&career.pressure),
            tb_career: RatioSnapshot::tiebreaks(&career.pressure),
            h2h_wins: h2h.wins_for(side),
            h2h_losses: h2h.wins_for(opponent_side),
            surfaces: Surface::ALL
                .map(|surface| store.surface.get(&PlayerSurface::new(player, surface)).into()),
            last5_wins: form.last_wins(5),
            last10_wins: form.last_wins(10),
            days_since_last_match: timeline.days_since(date),
            career_matches: timeline.matches,
            first_serve_pct_career: serve.first_serve_pct(),
            aces_per_service_game: serve.aces_per_service_game(),
            df_per_service_game: serve.double_faults_per_service_game(),
        }
    }

    fn tiebreaks(&mut self, record: &MatchRecord) -> TiebreakCount {
        let Some(score) = record.score.as_deref().filter(|s| !s.trim().is_empty()) else {
            return TiebreakCount::default();
        };

        let summary = ScoreSummary::parse(score);
        if summary.is_malformed() {
            self.stats.malformed_scores += 1;
            log::debug!(
                "Unreadable score {:?} ({} {} vs {}), counting no tiebreaks",
                score,
                record.date,
                record.winner.name,
                record.loser.name
            );
        }
        summary.tiebreaks(self.attribution)
    }

    fn commit(&mut self, keys: &MatchKeys, record: &MatchRecord, tiebreaks: TiebreakCount) {
        if keys.surface.is_none() {
            self.stats.missing_surface += 1;
        }

        let sides = [
            (&keys.winner, &record.winner, Outcome::Win, tiebreaks.won_by_winner),
            (&keys.loser, &record.loser, Outcome::Loss, tiebreaks.won_by_loser),
        ];

        for (player, entry, outcome, tb_won) in sides {
            let pressure = pressure_delta(entry, tb_won, tiebreaks.played);
            let store = &mut self.store;

            store.yearly.apply(
                PlayerYear::new(player, keys.year),
                &YearlyDelta { outcome, pressure },
            );
            store.career.apply(player.clone(), &pressure);
            if let Some(surface) = keys.surface {
                store
                    .surface
                    .apply(PlayerSurface::new(player, surface), &outcome);
            }
            store.form.apply(player.clone(), &outcome);
            store.timeline.apply(player.clone(), &record.date);
            store.serve.apply(player.clone(), &serve_delta(entry));
        }

        let winner_side = keys.pair.side_of(&keys.winner);
        self.store.h2h.apply(keys.pair.clone(), &winner_side);
    }
}

fn pressure_delta(entry: &PlayerEntry, tb_won: u32, tb_played: u32) -> PressureTally {
    PressureTally {
        bp_saved: count(entry.counters.break_points_saved),
        bp_faced: count(entry.counters.break_points_faced),
        tb_won: tb_won as u64,
        tb_played: tb_played as u64,
    }
}

fn serve_delta(entry: &PlayerEntry) -> ServeRecord {
    let c = &entry.counters;
    ServeRecord {
        first_serves_in: count(c.first_serves_in),
        serve_points: count(c.serve_points),
        aces: count(c.aces),
        double_faults: count(c.double_faults),
        service_games: count(c.service_games),
    }
}
