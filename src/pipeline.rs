//! One full feature pass
//!
//! Validate, sequence, run the engine over every match in order, derive the
//! stateless features in parallel and lay the result out as a table.

use crate::data::MatchTable;
use crate::features::derived::{DerivedCalculator, DerivedFeatures};
use crate::features::engine::{EngineStats, MatchSnapshot, SnapshotEngine};
use crate::features::sequencer;
use crate::features::store::AccumulatorStore;
use crate::features::table::{feature_columns, FeatureTable};
use crate::{Config, MatchRecord, Result, TennisError};

/// Output of a pass over in-memory records
#[derive(Debug, Clone)]
pub struct FeaturePass {
    /// Input positions in processing order
    pub order: Vec<usize>,
    /// Pre-match snapshots, aligned with `order`
    pub snapshots: Vec<MatchSnapshot>,
    /// Derived features, aligned with `order`
    pub derived: Vec<DerivedFeatures>,
    /// Accumulator state after the last match
    pub store: AccumulatorStore,
    pub stats: EngineStats,
}

impl FeaturePass {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snapshot for the record at input position `index`
    pub fn snapshot_for(&self, index: usize) -> Option<&MatchSnapshot> {
        let pos = self.order.iter().position(|&i| i == index)?;
        self.snapshots.get(pos)
    }
}

/// Run the engine and the derived calculator over `records`.
///
/// Records may arrive in any order; they are processed chronologically and
/// the store starts empty, so repeated runs give identical output.
pub fn run_pass(records: &[MatchRecord], config: &Config) -> Result<FeaturePass> {
    if records.is_empty() {
        return Err(TennisError::EmptyInput);
    }

    let order = sequencer::sequence(records);
    log::info!("Processing {} matches", order.len());

    let mut engine = SnapshotEngine::new(AccumulatorStore::new(), config.engine);
    let mut snapshots = Vec::with_capacity(order.len());
    for &index in &order {
        snapshots.push(engine.process(index + 1, &records[index])?);
    }

    let stats = engine.stats();
    let store = engine.into_store();
    log::info!(
        "Engine done: {} matches, {} players",
        stats.processed,
        store.player_count()
    );
    if stats.malformed_scores > 0 {
        log::warn!("{} scores could not be read for tiebreaks", stats.malformed_scores);
    }
    if stats.missing_surface > 0 {
        log::debug!("{} matches had no usable surface", stats.missing_surface);
    }

    let calculator = DerivedCalculator::new(&config.derived);
    let rows: Vec<(&MatchRecord, MatchSnapshot)> = order
        .iter()
        .zip(&snapshots)
        .map(|(&index, snapshot)| (&records[index], *snapshot))
        .collect();
    let derived = calculator.compute_all(&rows);

    Ok(FeaturePass {
        order,
        snapshots,
        derived,
        store,
        stats,
    })
}

/// Run a pass over a loaded table and append the feature columns to its
/// input columns, one row per match in processing order
pub fn build_feature_table(input: &MatchTable, config: &Config) -> Result<(FeatureTable, FeaturePass)> {
    let pass = run_pass(&input.records, config)?;

    let mut table = FeatureTable::new(&input.headers);
    for ((&index, snapshot), derived) in pass.order.iter().zip(&pass.snapshots).zip(&pass.derived) {
        let columns = feature_columns(snapshot, derived);
        table.push_row(input.raw[index].clone(), &columns);
    }

    log::info!(
        "Built feature table: {} rows x {} columns",
        table.len(),
        table.headers.len()
    );
    Ok((table, pass))
}
