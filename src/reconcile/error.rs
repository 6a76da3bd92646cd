//! Error type for reconciliation runs

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Write phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Blanket `active = FALSE` over the whole table
    Deactivate,
    /// `active = TRUE` for each batch of current prefixes
    Reactivate,
    /// Insert-or-update of each batch with the run timestamp
    Upsert,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Deactivate => write!(f, "deactivate"),
            Phase::Reactivate => write!(f, "reactivate"),
            Phase::Upsert => write!(f, "upsert"),
        }
    }
}

/// Failure of a fetch or reconciliation run
///
/// No variant is retried; every one of them aborts the current run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid ASN format: {0}")]
    InvalidIdentifier(String),

    #[error("Failed to fetch {identifier}: {status}")]
    FetchFailed { identifier: String, status: String },

    #[error("Malformed response for {identifier}: {reason}")]
    MalformedResponse { identifier: String, reason: String },

    /// `batch_index` is 1-based. `batch_size` counts the prefixes bound by
    /// the failed statement, so the blanket deactivate reports 1/1 with 0.
    #[error(
        "{phase} batch {batch_index}/{batch_count} ({batch_size} prefixes) failed for {identifier}: {source}"
    )]
    BatchWriteFailed {
        identifier: String,
        phase: Phase,
        batch_index: usize,
        batch_count: usize,
        batch_size: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A store failure outside the phase writes (table setup, transaction
    /// control)
    #[error("Store error during {operation} for {identifier}: {source}")]
    Store {
        identifier: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Reconciliation already running for {0}")]
    Busy(String),
}

impl ReconcileError {
    /// Short machine-readable kind, used in logs and responses
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::InvalidIdentifier(_) => "invalid_identifier",
            ReconcileError::FetchFailed { .. } => "fetch_failed",
            ReconcileError::MalformedResponse { .. } => "malformed_response",
            ReconcileError::BatchWriteFailed { .. } => "batch_write_failed",
            ReconcileError::Store { .. } => "store",
            ReconcileError::Busy(_) => "busy",
        }
    }
}
