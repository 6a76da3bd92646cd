#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Pfxsync - keep a local record of the prefixes an ASN announces
//!
//! Pfxsync fetches the announced-prefix list of an autonomous system from
//! RIPEstat and reconciles it into a SQLite table: prefixes still announced
//! are marked active with a fresh `last_seen_at`, prefixes that disappeared
//! are kept but marked inactive. It can be used as both a command-line
//! application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Fetcher, reconciler, SQLite store | `ureq`, `rusqlite` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `server` | HTTP trigger and scheduled runs | `axum`, `tokio`, `tower-http` |
//! | `cli` | Full CLI binary | All above + `clap` |
//!
//! # Architecture
//!
//! - **[`dataset`]**: Validated dataset identifiers
//! - **[`fetcher`]**: Sources of the current prefix list (RIPEstat, files)
//! - **[`reconcile`]**: The batched three-phase reconciler and run orchestration
//! - **[`database`]**: SQLite connection, schema, and prefix repository
//! - **[`config`]**: Configuration management
//! - **[`server`]**: HTTP trigger and scheduler (feature `server`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pfxsync::{PfxsyncConfig, SyncRunner};
//!
//! let config = PfxsyncConfig::new(&None)?;
//! let runner = SyncRunner::new(config);
//!
//! let result = runner.run("AS14593")?;
//! println!("{} now announces {} prefixes", result.asn, result.count);
//! ```

pub mod config;
pub mod database;
pub mod dataset;
pub mod fetcher;
pub mod output;
pub mod reconcile;

#[cfg(feature = "server")]
pub mod server;

pub use config::PfxsyncConfig;
pub use dataset::{DatasetId, DEFAULT_ASN};
pub use output::OutputFormat;

pub use database::{
    DatabaseConn, LastRun, PfxsyncDatabase, PrefixCounts, PrefixRecord, PrefixRepository,
    SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION,
};

pub use fetcher::{JsonFileSource, PrefixSource, RipeStatSource, StaticSource};

pub use reconcile::{
    BatchPlan, Phase, PrefixStore, ReconcileError, ReconcileResult, Reconciler, RunLocks,
    SyncRunner,
};

#[cfg(feature = "server")]
pub use server::{create_axum_router, start_server, ServerConfig, ServerState};
