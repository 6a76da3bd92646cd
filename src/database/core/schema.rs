//! Database schema management
//!
//! The database holds one bookkeeping table for metadata, one registry of
//! datasets, and one prefix table per dataset. Dataset tables are named after
//! their identifier (e.g. `"AS14593"`) and created on first use.

use crate::dataset::DatasetId;
use anyhow::{anyhow, Result};
use rusqlite::Connection;

/// Current schema version
/// Increment this when making breaking schema changes
pub const SCHEMA_VERSION: u32 = 1;

/// Schema definitions for the pfxsync database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// SQL for creating the meta table (schema version and per-run metadata)
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS pfxsync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for creating the dataset registry
    pub const DATASETS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS pfxsync_datasets (
            identifier TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for creating a dataset prefix table
    pub fn prefix_table(dataset: &DatasetId) -> String {
        format!(
            r#"
        CREATE TABLE IF NOT EXISTS {} (
            prefix TEXT PRIMARY KEY,
            active BOOLEAN NOT NULL DEFAULT FALSE,
            last_seen_at TEXT
        );
        "#,
            dataset.table_name()
        )
    }
}

/// Schema manager for the pfxsync database
///
/// Handles schema initialization, version checking, and dataset tables.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Initialize the database schema
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::META_TABLE, [])
            .map_err(|e| anyhow!("Failed to create meta table: {}", e))?;

        self.set_meta("schema_version", &SCHEMA_VERSION.to_string())?;

        self.conn
            .execute(SchemaDefinitions::DATASETS_TABLE, [])
            .map_err(|e| anyhow!("Failed to create datasets table: {}", e))?;

        Ok(())
    }

    /// Create the prefix table for a dataset and register it
    pub fn ensure_dataset(&self, dataset: &DatasetId) -> Result<()> {
        self.conn
            .execute(&SchemaDefinitions::prefix_table(dataset), [])
            .map_err(|e| anyhow!("Failed to create table for {}: {}", dataset, e))?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO pfxsync_datasets (identifier) VALUES (?1)",
                [dataset.as_str()],
            )
            .map_err(|e| anyhow!("Failed to register dataset {}: {}", dataset, e))?;

        Ok(())
    }

    /// Identifiers of all registered datasets
    pub fn datasets(&self) -> Result<Vec<DatasetId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identifier FROM pfxsync_datasets ORDER BY identifier")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row in rows {
            // Rows were validated on insert; skip anything edited by hand
            if let Ok(id) = DatasetId::parse(&row?) {
                results.push(id);
            }
        }
        Ok(results)
    }

    /// Check the current schema status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        let meta_exists: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='pfxsync_meta'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if meta_exists == 0 {
            return Ok(SchemaStatus::NotInitialized);
        }

        let current_version = self.get_schema_version()?;

        if current_version == SCHEMA_VERSION {
            if self.verify_integrity()? {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    fn get_schema_version(&self) -> Result<u32> {
        let version: String = self
            .conn
            .query_row(
                "SELECT value FROM pfxsync_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap_or_else(|_| "0".to_string());

        version
            .parse()
            .map_err(|e| anyhow!("Invalid schema version: {}", e))
    }

    fn verify_integrity(&self) -> Result<bool> {
        for table in ["pfxsync_meta", "pfxsync_datasets"] {
            let exists: i32 = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap_or(0);

            if exists == 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Set a metadata value
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO pfxsync_meta (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("Failed to set meta value: {}", e))?;
        Ok(())
    }

    /// Get a metadata value
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let result: Result<String, _> = self.conn.query_row(
            "SELECT value FROM pfxsync_meta WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to get meta value: {}", e)),
        }
    }

    /// Reset the bookkeeping tables
    ///
    /// Dataset tables hold the only copy of prefix history, so they are kept;
    /// they are re-registered the next time they are reconciled.
    pub fn reset(&self) -> Result<()> {
        self.conn.execute("DROP TABLE IF EXISTS pfxsync_datasets", [])?;
        self.conn.execute("DROP TABLE IF EXISTS pfxsync_meta", [])?;
        Ok(())
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database is not initialized (fresh database)
    NotInitialized,

    /// Schema is current and valid
    Current,

    /// Schema needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version (incompatible)
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Schema is corrupted (missing tables)
    Corrupted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_schema_not_initialized() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_schema_initialize() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.get_schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_older_version_needs_migration() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        manager.set_meta("schema_version", "0").unwrap();

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NeedsMigration {
                from: 0,
                to: SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn test_meta_operations() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        manager.set_meta("test_key", "test_value").unwrap();
        let value = manager.get_meta("test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        let missing = manager.get_meta("nonexistent").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_ensure_dataset() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();

        let b = DatasetId::parse("AS2").unwrap();
        let a = DatasetId::parse("14593").unwrap();
        manager.ensure_dataset(&b).unwrap();
        manager.ensure_dataset(&a).unwrap();
        manager.ensure_dataset(&a).unwrap();

        assert_eq!(manager.datasets().unwrap(), vec![a, b]);
    }

    #[test]
    fn test_reset_keeps_dataset_tables() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();

        let id = DatasetId::parse("AS1").unwrap();
        manager.ensure_dataset(&id).unwrap();

        manager.reset().unwrap();
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
        assert!(crate::database::core::connection::table_exists(&conn, "AS1").unwrap());
    }
}
