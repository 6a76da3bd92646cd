//! Core database infrastructure
//!
//! This module provides the foundational database components used throughout pfxsync:
//! - `DatabaseConn`: Core SQLite connection wrapper with configuration
//! - `SchemaManager`: Schema initialization and dataset table management
//! - `SchemaStatus`: Schema state enumeration

pub(crate) mod connection;
mod schema;

pub use connection::DatabaseConn;
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
