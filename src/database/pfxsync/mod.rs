//! Pfxsync database storage
//!
//! The persistent database holds one prefix table per reconciled dataset
//! plus bookkeeping (schema version, dataset registry, last-run records).

mod prefixes;

pub use prefixes::{LastRun, PrefixCounts, PrefixRecord, PrefixRepository};

use crate::database::core::{DatabaseConn, SchemaManager, SchemaStatus};
use crate::dataset::DatasetId;
use anyhow::Result;
use tracing::info;

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE_NAME: &str = "pfxsync-data.sqlite3";

/// Main pfxsync database (SQLite backend)
pub struct PfxsyncDatabase {
    db: DatabaseConn,
}

impl PfxsyncDatabase {
    /// Open the database at the specified path
    ///
    /// If the database doesn't exist, it will be created and initialized.
    /// Outdated or unreadable bookkeeping tables are rebuilt; dataset
    /// tables are never dropped.
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        let schema = SchemaManager::new(&db.conn);

        match schema.check_status()? {
            SchemaStatus::Current => {
                info!("Pfxsync database schema is current");
            }
            SchemaStatus::NotInitialized => {
                info!("Initializing pfxsync database schema");
                schema.initialize()?;
            }
            SchemaStatus::NeedsMigration { from, to } => {
                info!("Pfxsync database needs migration from v{} to v{}", from, to);
                schema.reset()?;
                schema.initialize()?;
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => {
                info!(
                    "Pfxsync database schema incompatible (db: v{}, required: v{}), resetting",
                    database_version, required_version
                );
                schema.reset()?;
                schema.initialize()?;
            }
            SchemaStatus::Corrupted => {
                info!("Pfxsync database schema corrupted, resetting");
                schema.reset()?;
                schema.initialize()?;
            }
        }

        Ok(Self { db })
    }

    /// Open the database from a data directory
    ///
    /// Uses the standard file path: `{data_dir}/pfxsync-data.sqlite3`
    pub fn open_in_dir(data_dir: &str) -> Result<Self> {
        let path = format!("{}/{}", data_dir.trim_end_matches('/'), DATABASE_FILE_NAME);
        Self::open(&path)
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        let schema = SchemaManager::new(&db.conn);
        schema.initialize()?;
        Ok(Self { db })
    }

    /// Get the prefix repository
    pub fn prefixes(&self) -> PrefixRepository<'_> {
        PrefixRepository::new(&self.db.conn)
    }

    /// Get the underlying database connection (for advanced queries)
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }

    /// Identifiers of all datasets reconciled into this database
    pub fn datasets(&self) -> Result<Vec<DatasetId>> {
        SchemaManager::new(&self.db.conn).datasets()
    }

    /// Get metadata value from the database
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        SchemaManager::new(&self.db.conn).get_meta(key)
    }

    /// Set metadata value in the database
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        SchemaManager::new(&self.db.conn).set_meta(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = PfxsyncDatabase::open_in_memory().unwrap();
        assert!(db.datasets().unwrap().is_empty());
    }

    #[test]
    fn test_open_in_dir_persists_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let id = DatasetId::parse("AS14593").unwrap();

        {
            let db = PfxsyncDatabase::open_in_dir(data_dir).unwrap();
            db.prefixes().ensure_table(&id).unwrap();
        }

        let db = PfxsyncDatabase::open_in_dir(data_dir).unwrap();
        assert_eq!(db.datasets().unwrap(), vec![id]);
        assert!(dir.path().join(DATABASE_FILE_NAME).exists());
    }

    #[test]
    fn test_meta_operations() {
        let db = PfxsyncDatabase::open_in_memory().unwrap();

        db.set_meta("test_key", "test_value").unwrap();
        let value = db.get_meta("test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));
    }
}
