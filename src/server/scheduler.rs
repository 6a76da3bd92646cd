//! Scheduled reconciliation
//!
//! Runs the configured dataset on a fixed interval, cron-style: the first
//! run happens one interval after startup. Failures are logged and do not
//! stop the schedule; a tick that finds the dataset busy is skipped.

use crate::dataset::DatasetId;
use crate::reconcile::{ReconcileError, ReconcileResult, SyncRunner};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

pub struct Scheduler {
    runner: SyncRunner,
    dataset: DatasetId,
    interval: Duration,
}

impl Scheduler {
    pub fn new(runner: SyncRunner, dataset: DatasetId, interval: Duration) -> Self {
        Self {
            runner,
            dataset,
            interval,
        }
    }

    /// Run indefinitely; spawn this as a tokio task
    pub async fn start(self) {
        info!(
            "[CRON] Scheduling updates for {} every {} seconds",
            self.dataset,
            self.interval.as_secs()
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Execute one scheduled run, swallowing its error
    pub async fn tick(&self) -> Option<ReconcileResult> {
        info!("[CRON] Updating ASN: {}", self.dataset);

        let runner = self.runner.clone();
        let identifier = self.dataset.to_string();
        match tokio::task::spawn_blocking(move || runner.run(&identifier)).await {
            Ok(Ok(result)) => {
                info!(
                    "[CRON] Completed update for {} ({} prefixes)",
                    result.asn, result.count
                );
                Some(result)
            }
            Ok(Err(ReconcileError::Busy(_))) => {
                warn!(
                    "[CRON] Skipping update for {}: a run is already in progress",
                    self.dataset
                );
                None
            }
            Ok(Err(e)) => {
                error!("[CRON] Failed update for {}: {}", self.dataset, e);
                None
            }
            Err(e) => {
                error!("[CRON] Update task for {} failed: {}", self.dataset, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PfxsyncConfig;
    use crate::database::PfxsyncDatabase;
    use crate::fetcher::{JsonFileSource, StaticSource};
    use std::sync::Arc;

    fn config_in(dir: &tempfile::TempDir) -> PfxsyncConfig {
        PfxsyncConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..PfxsyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_tick_reconciles_configured_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let dataset = config.asn.clone();
        let runner = SyncRunner::with_source(
            config,
            Arc::new(StaticSource::new(vec!["192.0.2.0/24".to_string()])),
        );

        let scheduler = Scheduler::new(runner, dataset.clone(), Duration::from_secs(3600));
        let result = scheduler.tick().await.unwrap();
        assert_eq!(result.asn, dataset);
        assert_eq!(result.count, 1);

        let db = PfxsyncDatabase::open_in_dir(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(db.prefixes().counts(&dataset).unwrap().active, 1);
    }

    #[tokio::test]
    async fn test_tick_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let dataset = config.asn.clone();
        let runner = SyncRunner::with_source(
            config,
            Arc::new(JsonFileSource::new("/nonexistent/pfxsync/prefixes.json")),
        );

        let scheduler = Scheduler::new(runner, dataset, Duration::from_secs(3600));
        assert!(scheduler.tick().await.is_none());
        // the next tick still runs
        assert!(scheduler.tick().await.is_none());
    }

    #[tokio::test]
    async fn test_tick_skips_busy_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let dataset = config.asn.clone();
        let runner = SyncRunner::with_source(config, Arc::new(StaticSource::default()));
        let _held = runner.locks().try_acquire(&dataset).unwrap();

        let scheduler = Scheduler::new(runner.clone(), dataset.clone(), Duration::from_secs(60));
        assert!(scheduler.tick().await.is_none());
        assert!(runner.locks().is_running(&dataset));
    }
}
