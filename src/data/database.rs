//! SQLite sink for feature tables

use crate::features::table::{feature_headers, FeatureTable};
use crate::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

/// Table holding the most recent feature table
pub const FEATURES_TABLE: &str = "match_features";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feature_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                input_path TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                column_count INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Replace `match_features` with `table` and log the run.
    ///
    /// Both happen in one transaction: a failure leaves the previous
    /// table and run log untouched.
    pub fn write_feature_table(&mut self, table: &FeatureTable, input_path: &str) -> Result<usize> {
        let columns: Vec<String> = table.headers.iter().map(|h| quote_identifier(h)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

        // Feature columns are numeric; input columns pass through as text
        let features: HashSet<String> = feature_headers().into_iter().collect();
        let numeric: Vec<bool> = table.headers.iter().map(|h| features.contains(h)).collect();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table_name}; CREATE TABLE {table_name} ({cols});",
            table_name = FEATURES_TABLE,
            cols = columns.join(", ")
        ))?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                FEATURES_TABLE,
                columns.join(", "),
                placeholders.join(", ")
            ))?;
            for row in &table.rows {
                let values = row.iter().zip(&numeric).map(|(cell, &is_numeric)| {
                    if is_numeric {
                        feature_value(cell)
                    } else {
                        text_value(cell)
                    }
                });
                stmt.execute(params_from_iter(values))?;
            }
        }

        tx.execute(
            "INSERT INTO feature_runs (input_path, row_count, column_count) VALUES (?1, ?2, ?3)",
            params![input_path, table.rows.len() as i64, table.headers.len() as i64],
        )?;
        tx.commit()?;

        log::info!(
            "Stored {} rows in SQLite table {}",
            table.rows.len(),
            FEATURES_TABLE
        );
        Ok(table.rows.len())
    }

    /// Most recent run, if any
    pub fn last_run(&self) -> Result<Option<FeatureRun>> {
        let run = self
            .conn
            .query_row(
                "SELECT created_at, input_path, row_count, column_count
                 FROM feature_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(FeatureRun {
                        created_at: row.get(0)?,
                        input_path: row.get(1)?,
                        row_count: row.get::<_, i64>(2)? as usize,
                        column_count: row.get::<_, i64>(3)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let run_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM feature_runs", [], |row| row.get(0))?;

        let has_features: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![FEATURES_TABLE],
            |row| row.get(0),
        )?;

        let feature_rows: i64 = if has_features > 0 {
            self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", FEATURES_TABLE),
                [],
                |row| row.get(0),
            )?
        } else {
            0
        };

        Ok(DatabaseStats {
            run_count: run_count as usize,
            feature_rows: feature_rows as usize,
            last_run: self.last_run()?,
        })
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Feature cell as a number, so the table can be queried without casts
fn feature_value(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else if let Ok(i) = cell.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = cell.parse::<f64>() {
        Value::Real(f)
    } else {
        Value::Text(cell.to_string())
    }
}

/// Input cell, stored verbatim
fn text_value(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else {
        Value::Text(cell.to_string())
    }
}

/// One row of the run log
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRun {
    pub created_at: String,
    pub input_path: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub run_count: usize,
    pub feature_rows: usize,
    pub last_run: Option<FeatureRun>,
}
