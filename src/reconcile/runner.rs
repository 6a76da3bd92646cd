//! End-to-end run: validate, fetch, reconcile
//!
//! [`SyncRunner`] is what both triggers call. It owns everything a run
//! needs (configuration, prefix source, run locks) and is cheap to clone
//! into tasks.

use crate::config::PfxsyncConfig;
use crate::database::PfxsyncDatabase;
use crate::dataset::DatasetId;
use crate::fetcher::{PrefixSource, RipeStatSource};
use crate::reconcile::{ReconcileError, ReconcileResult, Reconciler, RunLocks};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct SyncRunner {
    config: Arc<PfxsyncConfig>,
    source: Arc<dyn PrefixSource>,
    locks: RunLocks,
}

impl SyncRunner {
    /// Runner fetching from the configured RIPEstat URL
    pub fn new(config: PfxsyncConfig) -> Self {
        let source = RipeStatSource::new(config.source_url.clone());
        Self::with_source(config, Arc::new(source))
    }

    pub fn with_source(config: PfxsyncConfig, source: Arc<dyn PrefixSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
            locks: RunLocks::new(),
        }
    }

    pub fn config(&self) -> &PfxsyncConfig {
        &self.config
    }

    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    /// Reconcile one dataset against its currently announced prefixes
    ///
    /// The identifier is validated before anything else happens, so an
    /// invalid one causes neither a fetch nor a write. Blocks on network
    /// and disk I/O.
    pub fn run(&self, identifier: &str) -> Result<ReconcileResult, ReconcileError> {
        let dataset = DatasetId::parse(identifier)?;
        let _guard = self.locks.try_acquire(&dataset)?;

        let current = self.source.fetch_current_prefixes(&dataset)?;

        let plan = self.config.batch_plan().map_err(|source| {
            ReconcileError::Store {
                identifier: dataset.to_string(),
                operation: "plan",
                source,
            }
        })?;

        let db = PfxsyncDatabase::open_in_dir(&self.config.data_dir).map_err(|source| {
            ReconcileError::Store {
                identifier: dataset.to_string(),
                operation: "open",
                source,
            }
        })?;
        let mut repo = db.prefixes().with_atomic(self.config.atomic_runs);

        let result = Reconciler::new(&mut repo, plan).reconcile(&dataset, &current)?;
        info!(
            "[{}] Reconciled {} prefixes into {}",
            dataset,
            result.count,
            self.config.sqlite_path()
        );
        Ok(result)
    }
}

impl std::fmt::Debug for SyncRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRunner")
            .field("data_dir", &self.config.data_dir)
            .field("safe_limit", &self.config.safe_limit)
            .field("atomic_runs", &self.config.atomic_runs)
            .finish()
    }
}
