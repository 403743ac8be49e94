//! As-of feature computation
//!
//! Sequencing, per-player accumulators, the snapshot-update engine and the
//! stateless derived features built on top of it.

pub mod derived;
pub mod engine;
pub mod player_stats;
pub mod score;
pub mod sequencer;
pub mod store;
pub mod table;

pub use derived::{DerivedCalculator, DerivedFeatures};
pub use engine::{MatchSnapshot, SideSnapshot, SnapshotEngine};
pub use store::AccumulatorStore;
pub use table::FeatureTable;
