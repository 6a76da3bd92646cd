//! Prefix repository
//!
//! SQLite-backed store for per-dataset prefix tables. Each table has the
//! shape
//!
//! ```sql
//! prefix TEXT PRIMARY KEY, active BOOLEAN, last_seen_at TEXT
//! ```
//!
//! and is addressed only through a validated [`DatasetId`]. Data values are
//! always bound as parameters.

use crate::database::core::connection::table_exists;
use crate::database::core::SchemaManager;
use crate::dataset::DatasetId;
use crate::reconcile::PrefixStore;
use anyhow::{anyhow, Result};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One persisted prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRecord {
    pub prefix: String,
    pub active: bool,
    pub last_seen_at: Option<String>,
}

/// Record counts for a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct PrefixCounts {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

/// Summary of the last successful run, kept in the meta table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRun {
    pub seen_at: String,
    pub count: usize,
}

fn last_run_key(dataset: &DatasetId) -> String {
    format!("last_run:{}", dataset)
}

/// Repository for prefix tables
pub struct PrefixRepository<'a> {
    conn: &'a Connection,
    atomic: bool,
}

impl<'a> PrefixRepository<'a> {
    /// Create a new repository; runs are atomic by default
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn, atomic: true }
    }

    /// Choose whether a run's phases share one transaction
    ///
    /// Without it, a failure after phase 1 leaves the table deactivated
    /// until the next successful run.
    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    /// Check if the dataset table exists
    pub fn table_exists(&self, dataset: &DatasetId) -> bool {
        table_exists(self.conn, dataset.as_str()).unwrap_or(false)
    }

    /// Create the dataset table if needed
    pub fn ensure_table(&self, dataset: &DatasetId) -> Result<()> {
        SchemaManager::new(self.conn).ensure_dataset(dataset)
    }

    /// `UPDATE ... SET active = FALSE` over the whole table
    pub fn deactivate_all(&self, dataset: &DatasetId) -> Result<usize> {
        let sql = format!("UPDATE {} SET active = FALSE", dataset.table_name());
        self.conn
            .execute(&sql, [])
            .map_err(|e| anyhow!("Failed to deactivate {}: {}", dataset, e))
    }

    /// `UPDATE ... SET active = TRUE WHERE prefix IN (...)`
    pub fn reactivate(&self, dataset: &DatasetId, prefixes: &[String]) -> Result<usize> {
        if prefixes.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; prefixes.len()].join(",");
        let sql = format!(
            "UPDATE {} SET active = TRUE WHERE prefix IN ({})",
            dataset.table_name(),
            placeholders
        );

        self.conn
            .execute(&sql, params_from_iter(prefixes.iter()))
            .map_err(|e| anyhow!("Failed to reactivate {} prefixes: {}", prefixes.len(), e))
    }

    /// Insert the prefixes as active at `seen_at`, updating existing rows
    ///
    /// `last_seen_at` never moves backwards for an existing row.
    pub fn upsert(&self, dataset: &DatasetId, prefixes: &[String], seen_at: &str) -> Result<usize> {
        if prefixes.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["(?, TRUE, ?)"; prefixes.len()].join(",");
        let sql = format!(
            "INSERT INTO {} (prefix, active, last_seen_at)
             VALUES {}
             ON CONFLICT(prefix) DO UPDATE
             SET active = TRUE,
                 last_seen_at = max(coalesce(last_seen_at, excluded.last_seen_at), excluded.last_seen_at)",
            dataset.table_name(),
            placeholders
        );

        let ts: &dyn ToSql = &seen_at;
        let values: Vec<&dyn ToSql> = prefixes
            .iter()
            .flat_map(|p| [p as &dyn ToSql, ts])
            .collect();

        self.conn
            .execute(&sql, values.as_slice())
            .map_err(|e| anyhow!("Failed to upsert {} prefixes: {}", prefixes.len(), e))
    }

    /// All records of a dataset, ordered by prefix
    pub fn list(&self, dataset: &DatasetId, only_active: bool) -> Result<Vec<PrefixRecord>> {
        if !self.table_exists(dataset) {
            return Ok(Vec::new());
        }

        let filter = if only_active { " WHERE active" } else { "" };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT prefix, active, last_seen_at FROM {}{} ORDER BY prefix",
            dataset.table_name(),
            filter
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(PrefixRecord {
                prefix: row.get(0)?,
                active: row.get(1)?,
                last_seen_at: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }

    /// Look up a single prefix
    pub fn get(&self, dataset: &DatasetId, prefix: &str) -> Result<Option<PrefixRecord>> {
        if !self.table_exists(dataset) {
            return Ok(None);
        }

        let result = self.conn.query_row(
            &format!(
                "SELECT prefix, active, last_seen_at FROM {} WHERE prefix = ?1",
                dataset.table_name()
            ),
            [prefix],
            |row| {
                Ok(PrefixRecord {
                    prefix: row.get(0)?,
                    active: row.get(1)?,
                    last_seen_at: row.get(2)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to get prefix {}: {}", prefix, e)),
        }
    }

    /// Total, active and inactive record counts
    pub fn counts(&self, dataset: &DatasetId) -> Result<PrefixCounts> {
        if !self.table_exists(dataset) {
            return Ok(PrefixCounts::default());
        }

        let (total, active): (i64, i64) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN active THEN 1 ELSE 0 END), 0) FROM {}",
                dataset.table_name()
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(PrefixCounts {
            total: total as u64,
            active: active as u64,
            inactive: (total - active) as u64,
        })
    }

    /// Summary of the last successful run
    pub fn last_run(&self, dataset: &DatasetId) -> Result<Option<LastRun>> {
        let schema = SchemaManager::new(self.conn);
        match schema.get_meta(&last_run_key(dataset))? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| anyhow!("Invalid last-run record for {}: {}", dataset, e)),
            None => Ok(None),
        }
    }
}

impl PrefixStore for PrefixRepository<'_> {
    fn begin_run(&mut self, dataset: &DatasetId) -> Result<()> {
        self.ensure_table(dataset)?;
        if self.atomic {
            debug!("[{}] BEGIN IMMEDIATE", dataset);
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;
        }
        Ok(())
    }

    fn deactivate_all(&mut self, dataset: &DatasetId) -> Result<usize> {
        PrefixRepository::deactivate_all(self, dataset)
    }

    fn reactivate(&mut self, dataset: &DatasetId, prefixes: &[String]) -> Result<usize> {
        PrefixRepository::reactivate(self, dataset, prefixes)
    }

    fn upsert(&mut self, dataset: &DatasetId, prefixes: &[String], seen_at: &str) -> Result<usize> {
        PrefixRepository::upsert(self, dataset, prefixes, seen_at)
    }

    fn commit_run(&mut self, dataset: &DatasetId, seen_at: &str, count: usize) -> Result<()> {
        let record = serde_json::to_string(&LastRun {
            seen_at: seen_at.to_string(),
            count,
        })?;
        SchemaManager::new(self.conn).set_meta(&last_run_key(dataset), &record)?;

        if self.atomic {
            debug!("[{}] COMMIT", dataset);
            self.conn
                .execute_batch("COMMIT")
                .map_err(|e| anyhow!("Failed to commit transaction: {}", e))?;
        }
        Ok(())
    }

    fn abort_run(&mut self, dataset: &DatasetId) -> Result<()> {
        if self.atomic && !self.conn.is_autocommit() {
            debug!("[{}] ROLLBACK", dataset);
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| anyhow!("Failed to roll back transaction: {}", e))?;
        }
        Ok(())
    }
}
