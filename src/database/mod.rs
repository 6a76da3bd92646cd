//! Database module
//!
//! This module provides all database functionality for pfxsync, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connections, schema management)
//! - **pfxsync**: The persistent prefix database and its repository
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper
//! │   └── schema      # Bookkeeping tables and per-dataset prefix tables
//! │
//! └── pfxsync/        # Persistent storage
//!     └── prefixes    # Prefix records, batched writes, counts
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use pfxsync::database::PfxsyncDatabase;
//! use pfxsync::dataset::DatasetId;
//!
//! let db = PfxsyncDatabase::open_in_dir("~/.pfxsync")?;
//! let id = DatasetId::parse("AS14593")?;
//!
//! for record in db.prefixes().list(&id, true)? {
//!     println!("{} last seen {:?}", record.prefix, record.last_seen_at);
//! }
//! ```

pub mod core;
pub mod pfxsync;

pub use self::core::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};

pub use self::pfxsync::{
    LastRun, PfxsyncDatabase, PrefixCounts, PrefixRecord, PrefixRepository, DATABASE_FILE_NAME,
};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
