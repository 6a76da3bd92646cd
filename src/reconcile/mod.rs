//! Prefix reconciliation
//!
//! Turns a freshly fetched list of announced prefixes into state changes on
//! the persistent store. A run is three strictly sequential phases:
//!
//! 1. **Deactivate**: one statement sets `active = FALSE` on every record.
//! 2. **Reactivate**: the current list is cut into batches of `L` prefixes
//!    and each batch is set `active = TRUE` through an `IN (...)` predicate.
//! 3. **Upsert**: the list is cut again into batches of `floor(L / 2)` and
//!    each batch is inserted, or updated on prefix conflict, with
//!    `active = TRUE` and the run timestamp.
//!
//! Records are never deleted; a prefix absent from the current list simply
//! stays inactive. The first failing statement aborts the run.
//!
//! ```rust,ignore
//! use pfxsync::database::PfxsyncDatabase;
//! use pfxsync::dataset::DatasetId;
//! use pfxsync::reconcile::{BatchPlan, Reconciler};
//!
//! let db = PfxsyncDatabase::open_in_memory()?;
//! let mut repo = db.prefixes();
//! let dataset = DatasetId::parse("AS14593")?;
//! let current = vec!["192.0.2.0/24".to_string()];
//!
//! let result = Reconciler::new(&mut repo, BatchPlan::default()).reconcile(&dataset, &current)?;
//! assert_eq!(result.count, 1);
//! ```

mod batch;
mod error;
mod lock;
mod runner;
mod store;

pub use batch::{
    BatchPlan, DEFAULT_SAFE_LIMIT, PARAMS_PER_REACTIVATE_ROW, PARAMS_PER_UPSERT_ROW,
};
pub use error::{Phase, ReconcileError};
pub use lock::{RunGuard, RunLocks};
pub use runner::SyncRunner;
pub use store::PrefixStore;

use crate::dataset::DatasetId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct ReconcileResult {
    /// Dataset identifier
    pub asn: DatasetId,
    /// Number of prefixes in the current list
    pub count: usize,
}

/// Format a run timestamp as stored in `last_seen_at`
///
/// Fixed-width RFC 3339 in UTC, so text order equals time order.
pub fn format_seen_at(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Batched three-phase reconciler over a [`PrefixStore`]
pub struct Reconciler<'a, S: PrefixStore + ?Sized> {
    store: &'a mut S,
    plan: BatchPlan,
}

impl<'a, S: PrefixStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a mut S, plan: BatchPlan) -> Self {
        Self { store, plan }
    }

    /// Reconcile the dataset against `current`, timestamped now
    pub fn reconcile(
        &mut self,
        dataset: &DatasetId,
        current: &[String],
    ) -> Result<ReconcileResult, ReconcileError> {
        self.reconcile_at(dataset, current, Utc::now())
    }

    /// Reconcile the dataset against `current`
    ///
    /// `now` is captured once and written to every upserted row, so all
    /// prefixes touched by one run share the same `last_seen_at`.
    pub fn reconcile_at(
        &mut self,
        dataset: &DatasetId,
        current: &[String],
        now: DateTime<Utc>,
    ) -> Result<ReconcileResult, ReconcileError> {
        let seen_at = format_seen_at(now);
        info!("[{}] Total prefixes from RIPE: {}", dataset, current.len());

        self.store
            .begin_run(dataset)
            .map_err(|source| store_error(dataset, "begin", source))?;

        if let Err(e) = self.run_phases(dataset, current, &seen_at) {
            self.abort(dataset);
            return Err(e);
        }

        if let Err(source) = self.store.commit_run(dataset, &seen_at, current.len()) {
            self.abort(dataset);
            return Err(store_error(dataset, "commit", source));
        }

        Ok(ReconcileResult {
            asn: dataset.clone(),
            count: current.len(),
        })
    }

    fn run_phases(
        &mut self,
        dataset: &DatasetId,
        current: &[String],
        seen_at: &str,
    ) -> Result<(), ReconcileError> {
        self.deactivate_all(dataset)?;
        self.reactivate_current(dataset, current)?;
        self.upsert_current(dataset, current, seen_at)?;
        Ok(())
    }

    fn deactivate_all(&mut self, dataset: &DatasetId) -> Result<(), ReconcileError> {
        info!("[{}] Marking all records as inactive...", dataset);
        let updated = match self.store.deactivate_all(dataset) {
            Ok(updated) => updated,
            Err(source) => {
                error!("[{}] Failed to mark records inactive: {}", dataset, source);
                return Err(ReconcileError::BatchWriteFailed {
                    identifier: dataset.to_string(),
                    phase: Phase::Deactivate,
                    batch_index: 1,
                    batch_count: 1,
                    batch_size: 0,
                    source,
                });
            }
        };
        info!("[{}] {} records marked inactive", dataset, updated);
        Ok(())
    }

    fn reactivate_current(
        &mut self,
        dataset: &DatasetId,
        current: &[String],
    ) -> Result<(), ReconcileError> {
        let batch_count = self.plan.reactivate_batch_count(current.len());
        info!(
            "[{}] Re-activating current prefixes in chunks of {}...",
            dataset,
            self.plan.reactivate_batch_size()
        );

        for (i, chunk) in self.plan.reactivate_batches(current).enumerate() {
            if chunk.is_empty() {
                continue;
            }
            info!(
                "[{}] Chunk {}/{} - {} prefixes",
                dataset,
                i + 1,
                batch_count,
                chunk.len()
            );

            if let Err(source) = self.store.reactivate(dataset, chunk) {
                error!(
                    "[{}] Failed to run chunk {} - {} variables: {}",
                    dataset,
                    i + 1,
                    chunk.len(),
                    source
                );
                return Err(ReconcileError::BatchWriteFailed {
                    identifier: dataset.to_string(),
                    phase: Phase::Reactivate,
                    batch_index: i + 1,
                    batch_count,
                    batch_size: chunk.len(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn upsert_current(
        &mut self,
        dataset: &DatasetId,
        current: &[String],
        seen_at: &str,
    ) -> Result<(), ReconcileError> {
        let batch_count = self.plan.upsert_batch_count(current.len());
        info!(
            "[{}] Upserting prefixes in chunks of {}...",
            dataset,
            self.plan.upsert_batch_size()
        );

        for (i, chunk) in self.plan.upsert_batches(current).enumerate() {
            info!(
                "[{}] Upsert chunk {}/{} - {} rows",
                dataset,
                i + 1,
                batch_count,
                chunk.len()
            );

            if let Err(source) = self.store.upsert(dataset, chunk, seen_at) {
                error!(
                    "[{}] Failed batch upsert chunk {} - {} rows: {}",
                    dataset,
                    i + 1,
                    chunk.len(),
                    source
                );
                return Err(ReconcileError::BatchWriteFailed {
                    identifier: dataset.to_string(),
                    phase: Phase::Upsert,
                    batch_index: i + 1,
                    batch_count,
                    batch_size: chunk.len(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn abort(&mut self, dataset: &DatasetId) {
        if let Err(e) = self.store.abort_run(dataset) {
            warn!("[{}] Failed to abort run cleanly: {}", dataset, e);
        }
    }
}

fn store_error(
    dataset: &DatasetId,
    operation: &'static str,
    source: anyhow::Error,
) -> ReconcileError {
    error!("[{}] Store error during {}: {}", dataset, operation, source);
    ReconcileError::Store {
        identifier: dataset.to_string(),
        operation,
        source,
    }
}
