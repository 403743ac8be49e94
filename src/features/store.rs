//! Accumulator store
//!
//! Keyed running aggregates for one processing pass. Every key resolves to a
//! single mutable cell, created at zero on first reference and never removed.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::hash::Hash;

use crate::features::player_stats::{
    CareerRecord, FormWindow, H2HRecord, PressureTally, ServeRecord, SurfaceRecord,
    TimelineRecord, WinLoss, YearlyRecord,
};
use crate::{PlayerId, Surface};

/// A cell that folds deltas into itself
pub trait Accumulate: Default + Clone {
    type Delta;

    fn accumulate(&mut self, delta: &Self::Delta);
}

/// Map from key to accumulator cell
#[derive(Debug, Clone)]
pub struct AccumulatorMap<K, V> {
    cells: HashMap<K, V>,
}

impl<K, V> Default for AccumulatorMap<K, V> {
    fn default() -> Self {
        AccumulatorMap {
            cells: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Accumulate> AccumulatorMap<K, V> {
    /// Snapshot of a cell; zero state if the key was never applied
    pub fn get(&self, key: &K) -> V {
        self.cells.get(key).cloned().unwrap_or_default()
    }

    /// Commit a delta to a cell, creating it if needed
    pub fn apply(&mut self, key: K, delta: &V::Delta) {
        self.cells.entry(key).or_default().accumulate(delta);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cells.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// (player, calendar year)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerYear {
    pub player: PlayerId,
    pub year: i32,
}

impl PlayerYear {
    pub fn new(player: &PlayerId, year: i32) -> Self {
        PlayerYear {
            player: player.clone(),
            year,
        }
    }
}

/// (player, surface)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerSurface {
    pub player: PlayerId,
    pub surface: Surface,
}

impl PlayerSurface {
    pub fn new(player: &PlayerId, surface: Surface) -> Self {
        PlayerSurface {
            player: player.clone(),
            surface,
        }
    }
}

/// Position of a player within a canonical pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    First,
    Second,
}

/// Unordered pair of players, stored smaller identity first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    first: PlayerId,
    second: PlayerId,
}

impl PairKey {
    /// Canonical key for two players; argument order does not matter
    pub fn new(a: &PlayerId, b: &PlayerId) -> Self {
        if a <= b {
            PairKey {
                first: a.clone(),
                second: b.clone(),
            }
        } else {
            PairKey {
                first: b.clone(),
                second: a.clone(),
            }
        }
    }

    /// Which side of the pair `player` occupies
    pub fn side_of(&self, player: &PlayerId) -> PairSide {
        if *player == self.first {
            PairSide::First
        } else {
            debug_assert_eq!(*player, self.second);
            PairSide::Second
        }
    }
}

/// All accumulators for one pass, owned by the engine while it runs
#[derive(Debug, Clone, Default)]
pub struct AccumulatorStore {
    pub yearly: AccumulatorMap<PlayerYear, YearlyRecord>,
    pub career: AccumulatorMap<PlayerId, CareerRecord>,
    pub h2h: AccumulatorMap<PairKey, H2HRecord>,
    pub surface: AccumulatorMap<PlayerSurface, SurfaceRecord>,
    pub form: AccumulatorMap<PlayerId, FormWindow>,
    pub timeline: AccumulatorMap<PlayerId, TimelineRecord>,
    pub serve: AccumulatorMap<PlayerId, ServeRecord>,
}

impl AccumulatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct players seen so far
    pub fn player_count(&self) -> usize {
        self.timeline.len()
    }

    /// Current state for one player, `None` if they never played
    pub fn player_summary(&self, player: &PlayerId) -> Option<PlayerSummary> {
        if !self.timeline.contains(player) {
            return None;
        }
        let timeline = self.timeline.get(player);
        let last_match = timeline.last_date?;
        let year = last_match.year();

        Some(PlayerSummary {
            player: player.clone(),
            career_matches: timeline.matches,
            last_match,
            year,
            season: self.yearly.get(&PlayerYear::new(player, year)),
            career: self.career.get(player).pressure,
            surfaces: Surface::ALL.map(|s| self.surface.get(&PlayerSurface::new(player, s))),
            form: self.form.get(player),
            serve: self.serve.get(player),
        })
    }

    /// Head-to-head wins of `player` over `opponent`, and the reverse
    pub fn head_to_head(&self, player: &PlayerId, opponent: &PlayerId) -> (u32, u32) {
        let pair = PairKey::new(player, opponent);
        let record = self.h2h.get(&pair);
        let side = pair.side_of(player);
        let other = match side {
            PairSide::First => PairSide::Second,
            PairSide::Second => PairSide::First,
        };
        (record.wins_for(side), record.wins_for(other))
    }
}

/// A player's accumulated state at the end of a pass
#[derive(Debug, Clone)]
pub struct PlayerSummary {
    pub player: PlayerId,
    pub career_matches: u32,
    pub last_match: NaiveDate,
    /// Year of the last match; `season` covers this year only
    pub year: i32,
    pub season: YearlyRecord,
    pub career: PressureTally,
    /// Indexed by `Surface::index`
    pub surfaces: [WinLoss; 4],
    pub form: FormWindow,
    pub serve: ServeRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::player_stats::{Outcome, YearlyDelta};

    fn pid(name: &str) -> PlayerId {
        PlayerId::new(name)
    }

    #[test]
    fn test_unseen_key_reads_zero() {
        let map: AccumulatorMap<PlayerId, WinLoss> = AccumulatorMap::default();
        assert_eq!(map.get(&pid("Nobody")), WinLoss::default());
        assert!(!map.contains(&pid("Nobody")));
        assert!(map.is_empty());
    }

    #[test]
    fn test_repeated_key_aliases_same_cell() {
        let mut map: AccumulatorMap<PlayerId, WinLoss> = AccumulatorMap::default();
        map.apply(pid("Nadal"), &Outcome::Win);
        map.apply(PlayerId::new(String::from("Nadal")), &Outcome::Loss);
        map.apply(pid("Nadal"), &Outcome::Win);

        let record = map.get(&pid("Nadal"));
        assert_eq!(record.wins, 2);
        assert_eq!(record.losses, 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_get_returns_snapshot_not_live_cell() {
        let mut map: AccumulatorMap<PlayerId, WinLoss> = AccumulatorMap::default();
        map.apply(pid("Murray"), &Outcome::Win);
        let before = map.get(&pid("Murray"));
        map.apply(pid("Murray"), &Outcome::Win);
        assert_eq!(before.wins, 1);
        assert_eq!(map.get(&pid("Murray")).wins, 2);
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let a = pid("Djokovic");
        let b = pid("Alcaraz");
        let k1 = PairKey::new(&a, &b);
        let k2 = PairKey::new(&b, &a);

        assert_eq!(k1, k2);
        assert_eq!(k1.side_of(&b), PairSide::First);
        assert_eq!(k1.side_of(&a), PairSide::Second);
    }

    #[test]
    fn test_year_and_surface_keys_separate_cells() {
        let mut map: AccumulatorMap<PlayerYear, WinLoss> = AccumulatorMap::default();
        map.apply(PlayerYear::new(&pid("Thiem"), 2019), &Outcome::Win);
        map.apply(PlayerYear::new(&pid("Thiem"), 2020), &Outcome::Loss);
        assert_eq!(map.get(&PlayerYear::new(&pid("Thiem"), 2019)).wins, 1);
        assert_eq!(map.get(&PlayerYear::new(&pid("Thiem"), 2020)).losses, 1);

        let mut surfaces: AccumulatorMap<PlayerSurface, WinLoss> = AccumulatorMap::default();
        surfaces.apply(PlayerSurface::new(&pid("Thiem"), Surface::Clay), &Outcome::Win);
        assert_eq!(
            surfaces.get(&PlayerSurface::new(&pid("Thiem"), Surface::Grass)),
            WinLoss::default()
        );
    }

    #[test]
    fn test_player_summary_reads_last_season() {
        let mut store = AccumulatorStore::new();
        let murray = pid("Murray");
        let dates = [
            NaiveDate::from_ymd_opt(2016, 11, 20).unwrap(),
            NaiveDate::from_ymd_opt(2017, 1, 2).unwrap(),
        ];
        for (date, outcome) in dates.iter().zip([Outcome::Win, Outcome::Loss]) {
            let delta = YearlyDelta {
                outcome,
                pressure: PressureTally::default(),
            };
            store.yearly.apply(PlayerYear::new(&murray, date.year()), &delta);
            store.timeline.apply(murray.clone(), date);
            store.form.apply(murray.clone(), &outcome);
        }

        assert!(store.player_summary(&pid("Nobody")).is_none());

        let summary = store.player_summary(&murray).unwrap();
        assert_eq!(summary.career_matches, 2);
        assert_eq!(summary.year, 2017);
        assert_eq!(summary.last_match, dates[1]);
        assert_eq!(summary.season.record, WinLoss { wins: 0, losses: 1 });
        assert_eq!(summary.form.last_wins(10), 1);
    }

    #[test]
    fn test_head_to_head_from_either_side() {
        let mut store = AccumulatorStore::new();
        let (a, b) = (pid("Federer"), pid("Nadal"));
        let pair = PairKey::new(&a, &b);
        store.h2h.apply(pair.clone(), &pair.side_of(&b));
        store.h2h.apply(pair.clone(), &pair.side_of(&b));
        store.h2h.apply(pair.clone(), &pair.side_of(&a));

        assert_eq!(store.head_to_head(&a, &b), (1, 2));
        assert_eq!(store.head_to_head(&b, &a), (2, 1));
    }
}
