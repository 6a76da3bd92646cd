//! Persistent store interface used by the reconciler

use crate::dataset::DatasetId;
use anyhow::Result;

/// Write operations the reconciler issues against a prefix store
///
/// Each method maps to exactly one statement, so the number of calls is the
/// number of statements sent to the backing store. `begin_run` /
/// `commit_run` / `abort_run` bracket one run and let the store decide
/// whether the phases share a transaction.
pub trait PrefixStore {
    /// Prepare the dataset table and open the run
    fn begin_run(&mut self, dataset: &DatasetId) -> Result<()>;

    /// Mark every record of the dataset inactive
    fn deactivate_all(&mut self, dataset: &DatasetId) -> Result<usize>;

    /// Mark the given prefixes active (one bound parameter per prefix)
    fn reactivate(&mut self, dataset: &DatasetId, prefixes: &[String]) -> Result<usize>;

    /// Insert or update the given prefixes as active, seen at `seen_at`
    /// (two bound parameters per prefix)
    fn upsert(&mut self, dataset: &DatasetId, prefixes: &[String], seen_at: &str)
        -> Result<usize>;

    /// Close a successful run, recording its timestamp and prefix count
    fn commit_run(&mut self, dataset: &DatasetId, seen_at: &str, count: usize) -> Result<()>;

    /// Close a failed run
    fn abort_run(&mut self, dataset: &DatasetId) -> Result<()>;
}
