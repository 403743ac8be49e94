//! Data input and storage
//!
//! CSV reading and writing plus the SQLite feature sink.

pub mod csv_io;
pub mod database;

pub use csv_io::{load_matches, read_matches, save_feature_table, write_table, MatchTable};
pub use database::Database;
