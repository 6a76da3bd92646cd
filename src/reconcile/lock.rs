//! Per-dataset run exclusion
//!
//! Two runs against the same table can interleave their phases, so one
//! run's blanket deactivation may land after another run's reactivation.
//! [`RunLocks`] allows at most one in-flight run per identifier within the
//! process; a second request is rejected with [`ReconcileError::Busy`].

use crate::dataset::DatasetId;
use crate::reconcile::ReconcileError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of datasets with a run in progress
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    active: Arc<Mutex<HashSet<DatasetId>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the dataset for one run
    ///
    /// The claim is released when the returned guard is dropped.
    pub fn try_acquire(&self, dataset: &DatasetId) -> Result<RunGuard, ReconcileError> {
        let mut active = lock_set(&self.active);
        if !active.insert(dataset.clone()) {
            return Err(ReconcileError::Busy(dataset.to_string()));
        }
        Ok(RunGuard {
            active: Arc::clone(&self.active),
            dataset: dataset.clone(),
        })
    }

    /// Whether a run is currently in progress for the dataset
    pub fn is_running(&self, dataset: &DatasetId) -> bool {
        lock_set(&self.active).contains(dataset)
    }
}

/// Held for the duration of one run
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<Mutex<HashSet<DatasetId>>>,
    dataset: DatasetId,
}

impl RunGuard {
    pub fn dataset(&self) -> &DatasetId {
        &self.dataset
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        lock_set(&self.active).remove(&self.dataset);
    }
}

// The set stays consistent even if a holder panicked, so a poisoned lock is
// still usable.
fn lock_set(set: &Mutex<HashSet<DatasetId>>) -> MutexGuard<'_, HashSet<DatasetId>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let locks = RunLocks::new();
        let id = DatasetId::parse("AS1").unwrap();

        let guard = locks.try_acquire(&id).unwrap();
        assert!(locks.is_running(&id));
        assert!(matches!(
            locks.try_acquire(&id),
            Err(ReconcileError::Busy(ref v)) if v == "AS1"
        ));

        drop(guard);
        assert!(!locks.is_running(&id));
        assert!(locks.try_acquire(&id).is_ok());
    }

    #[test]
    fn test_different_datasets_do_not_block() {
        let locks = RunLocks::new();
        let a = DatasetId::parse("AS1").unwrap();
        let b = DatasetId::parse("AS2").unwrap();

        let _ga = locks.try_acquire(&a).unwrap();
        let gb = locks.try_acquire(&b).unwrap();
        assert_eq!(gb.dataset(), &b);
    }

    #[test]
    fn test_clones_share_state() {
        let locks = RunLocks::new();
        let other = locks.clone();
        let id = DatasetId::parse("AS1").unwrap();

        let _guard = locks.try_acquire(&id).unwrap();
        assert!(other.try_acquire(&id).is_err());
    }
}
