//! Batch sizing under a bound-parameter ceiling
//!
//! SQLite rejects statements carrying more bound parameters than its
//! configured maximum, and hosted SQLite services often set that maximum
//! far below the library default. Every batched write is sized from a
//! single safety limit `L`:
//!
//! - reactivation binds one parameter per prefix, so it takes `L` prefixes;
//! - upsert binds [`PARAMS_PER_UPSERT_ROW`] parameters per prefix, so it
//!   takes `floor(L / PARAMS_PER_UPSERT_ROW)` prefixes.

use anyhow::{anyhow, Result};
use std::slice::Chunks;

/// Default safety limit on bound parameters per statement
pub const DEFAULT_SAFE_LIMIT: usize = 100;

/// Bound parameters per reactivation row (the prefix)
pub const PARAMS_PER_REACTIVATE_ROW: usize = 1;

/// Bound parameters per upsert row (prefix and timestamp)
pub const PARAMS_PER_UPSERT_ROW: usize = 2;

/// Batch sizes derived from a safety limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    limit: usize,
}

impl BatchPlan {
    /// Create a plan for the given limit
    ///
    /// The limit must leave room for at least one upsert row.
    pub fn new(limit: usize) -> Result<Self> {
        if limit < PARAMS_PER_UPSERT_ROW {
            return Err(anyhow!(
                "safe limit must be at least {}, got {}",
                PARAMS_PER_UPSERT_ROW,
                limit
            ));
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Prefixes per reactivation statement
    pub fn reactivate_batch_size(&self) -> usize {
        self.limit / PARAMS_PER_REACTIVATE_ROW
    }

    /// Prefixes per upsert statement
    pub fn upsert_batch_size(&self) -> usize {
        self.limit / PARAMS_PER_UPSERT_ROW
    }

    pub fn reactivate_batches<'a>(&self, prefixes: &'a [String]) -> Chunks<'a, String> {
        prefixes.chunks(self.reactivate_batch_size())
    }

    pub fn upsert_batches<'a>(&self, prefixes: &'a [String]) -> Chunks<'a, String> {
        prefixes.chunks(self.upsert_batch_size())
    }

    /// Number of reactivation statements for `n` prefixes
    pub fn reactivate_batch_count(&self, n: usize) -> usize {
        n.div_ceil(self.reactivate_batch_size())
    }

    /// Number of upsert statements for `n` prefixes
    pub fn upsert_batch_count(&self, n: usize) -> usize {
        n.div_ceil(self.upsert_batch_size())
    }
}

impl Default for BatchPlan {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SAFE_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.{}.{}.0/24", i / 256, i % 256)).collect()
    }

    #[test]
    fn test_default_sizes() {
        let plan = BatchPlan::default();
        assert_eq!(plan.limit(), 100);
        assert_eq!(plan.reactivate_batch_size(), 100);
        assert_eq!(plan.upsert_batch_size(), 50);
    }

    #[test]
    fn test_250_prefixes_with_limit_100() {
        let plan = BatchPlan::new(100).unwrap();
        let list = prefixes(250);

        let reactivate: Vec<usize> = plan.reactivate_batches(&list).map(|c| c.len()).collect();
        assert_eq!(reactivate, vec![100, 100, 50]);

        let upsert: Vec<usize> = plan.upsert_batches(&list).map(|c| c.len()).collect();
        assert_eq!(upsert, vec![50, 50, 50, 50, 50]);
    }

    #[test]
    fn test_odd_limit_rounds_down() {
        let plan = BatchPlan::new(7).unwrap();
        assert_eq!(plan.reactivate_batch_size(), 7);
        assert_eq!(plan.upsert_batch_size(), 3);

        let list = prefixes(10);
        let upsert: Vec<usize> = plan.upsert_batches(&list).map(|c| c.len()).collect();
        assert_eq!(upsert, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_batch_counts_match_chunks() {
        for limit in [2, 3, 10, 99, 100, 999] {
            let plan = BatchPlan::new(limit).unwrap();
            for n in [0, 1, limit / 2, limit, limit + 1, 3 * limit + 7] {
                let list = prefixes(n);
                assert_eq!(
                    plan.reactivate_batch_count(n),
                    plan.reactivate_batches(&list).count()
                );
                assert_eq!(plan.upsert_batch_count(n), plan.upsert_batches(&list).count());
                assert_eq!(plan.reactivate_batch_count(n), n.div_ceil(limit));
                assert_eq!(plan.upsert_batch_count(n), n.div_ceil(limit / 2));
            }
        }
    }

    #[test]
    fn test_empty_list_has_no_batches() {
        let plan = BatchPlan::default();
        assert_eq!(plan.reactivate_batches(&[]).count(), 0);
        assert_eq!(plan.upsert_batches(&[]).count(), 0);
    }

    #[test]
    fn test_limit_too_small() {
        assert!(BatchPlan::new(0).is_err());
        assert!(BatchPlan::new(1).is_err());
        assert!(BatchPlan::new(2).is_ok());
    }
}
