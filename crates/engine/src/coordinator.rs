//! Commit coordinator for mutation batches
//!
//! Sits between the record store and its storage:
//! - Hands planned batches to `RecordStorage::apply`
//! - Logs commits and aborts (failures are returned, never swallowed)
//! - Keeps batch and mutation metrics

use std::sync::atomic::{AtomicU64, Ordering};

use tempora_core::{CommitReceipt, MutationBatch, MutationCounts, RecordStorage, TemporaResult};
use tracing::{debug, warn};

/// Commit coordinator for a record store
///
/// # Memory Ordering
///
/// Every counter uses Relaxed ordering. They are observational only and
/// synchronize nothing; storage provides the commit ordering itself.
#[derive(Debug, Default)]
pub struct CommitCoordinator {
    /// Batches handed to storage
    total_submitted: AtomicU64,
    /// Batches storage accepted
    total_committed: AtomicU64,
    /// Batches storage rejected
    total_aborted: AtomicU64,
    /// Versions removed by committed batches
    versions_removed: AtomicU64,
    /// Versions whose bounds changed in committed batches
    versions_updated: AtomicU64,
    /// Versions created by committed batches
    versions_inserted: AtomicU64,
}

impl CommitCoordinator {
    /// Create a coordinator with zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit one batch
    ///
    /// `validate_revisions` turns on per-identity optimistic concurrency
    /// checks in storage. The batch is all or nothing either way.
    ///
    /// # Errors
    ///
    /// Whatever storage rejected the batch with, typically a
    /// `TransactionFailure`. The abort is counted and logged first.
    pub fn commit<S: RecordStorage + ?Sized>(
        &self,
        storage: &S,
        batch: MutationBatch,
        validate_revisions: bool,
    ) -> TemporaResult<CommitReceipt> {
        let identities = batch.touched_uids().len();
        let checked = if validate_revisions {
            batch.expected_revisions().len()
        } else {
            0
        };
        let mutations = batch.len();
        self.total_submitted.fetch_add(1, Ordering::Relaxed);

        match storage.apply(batch, validate_revisions) {
            Ok(receipt) => {
                self.record_commit(&receipt.applied);
                debug!(
                    target: "tempora::txn",
                    version = receipt.version,
                    identities,
                    checked,
                    removed = receipt.applied.removed,
                    updated = receipt.applied.updated,
                    inserted = receipt.applied.inserted,
                    "Batch committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                self.record_abort();
                warn!(
                    target: "tempora::txn",
                    error = %e,
                    identities,
                    checked,
                    mutations,
                    "Batch aborted"
                );
                Err(e)
            }
        }
    }

    /// Record a committed batch
    pub fn record_commit(&self, applied: &MutationCounts) {
        self.total_committed.fetch_add(1, Ordering::Relaxed);
        self.versions_removed
            .fetch_add(applied.removed, Ordering::Relaxed);
        self.versions_updated
            .fetch_add(applied.updated, Ordering::Relaxed);
        self.versions_inserted
            .fetch_add(applied.inserted, Ordering::Relaxed);
    }

    /// Record a rejected batch
    pub fn record_abort(&self) {
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get store metrics
    ///
    /// Returns current snapshot of commit statistics.
    pub fn metrics(&self) -> StoreMetrics {
        let submitted = self.total_submitted.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        StoreMetrics {
            total_submitted: submitted,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            versions_removed: self.versions_removed.load(Ordering::Relaxed),
            versions_updated: self.versions_updated.load(Ordering::Relaxed),
            versions_inserted: self.versions_inserted.load(Ordering::Relaxed),
            commit_rate: if submitted > 0 {
                committed as f64 / submitted as f64
            } else {
                0.0
            },
        }
    }
}

/// Store metrics
///
/// Provides statistics about committed and rejected batches.
#[derive(Debug, Clone)]
pub struct StoreMetrics {
    /// Total number of batches submitted to storage
    pub total_submitted: u64,
    /// Total number of batches committed
    pub total_committed: u64,
    /// Total number of batches aborted
    pub total_aborted: u64,
    /// Versions removed by committed batches
    pub versions_removed: u64,
    /// Versions whose bounds were adjusted by committed batches
    pub versions_updated: u64,
    /// Versions inserted by committed batches
    pub versions_inserted: u64,
    /// Commit success rate (committed / submitted)
    pub commit_rate: f64,
}

impl StoreMetrics {
    /// Total mutations applied by committed batches
    pub fn total_mutations(&self) -> u64 {
        self.versions_removed + self.versions_updated + self.versions_inserted
    }

    /// Abort rate (aborted / submitted)
    pub fn abort_rate(&self) -> f64 {
        if self.total_submitted > 0 {
            self.total_aborted as f64 / self.total_submitted as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempora_core::{Mutation, Record, StoredVersion, Timestamp, Uid, Validity};
    use tempora_storage::MemoryStore;

    fn insert_batch(uid: &str, start: i64) -> MutationBatch {
        let record = Record::new(serde_json::json!({ "uid": uid }));
        let version = StoredVersion::from_record(
            Uid::new(uid),
            record.content_hash().unwrap(),
            Validity::open(Timestamp::from_secs(start)),
            &record,
        );
        let mut batch = MutationBatch::new();
        batch.expect_revision(Uid::new(uid), 0);
        batch.push(Mutation::Insert(version));
        batch
    }

    #[test]
    fn test_coordinator_new() {
        let coordinator = CommitCoordinator::new();
        let metrics = coordinator.metrics();
        assert_eq!(metrics.total_submitted, 0);
        assert_eq!(metrics.total_committed, 0);
        assert_eq!(metrics.total_aborted, 0);
        assert_eq!(metrics.commit_rate, 0.0);
        assert_eq!(metrics.abort_rate(), 0.0);
    }

    #[test]
    fn test_commit_updates_metrics() {
        let coordinator = CommitCoordinator::new();
        let store = MemoryStore::new();

        let receipt = coordinator
            .commit(&store, insert_batch("p1", 0), true)
            .unwrap();
        assert_eq!(receipt.applied.inserted, 1);

        let metrics = coordinator.metrics();
        assert_eq!(metrics.total_committed, 1);
        assert_eq!(metrics.versions_inserted, 1);
        assert_eq!(metrics.total_mutations(), 1);
        assert_eq!(metrics.commit_rate, 1.0);
    }

    #[test]
    fn test_abort_is_returned_and_counted() {
        let coordinator = CommitCoordinator::new();
        let store = MemoryStore::new();
        coordinator
            .commit(&store, insert_batch("p1", 0), true)
            .unwrap();

        // Revision 0 is stale after the first commit
        let err = coordinator
            .commit(&store, insert_batch("p1", 10), true)
            .unwrap_err();
        assert!(err.is_transaction_failure());

        let metrics = coordinator.metrics();
        assert_eq!(metrics.total_submitted, 2);
        assert_eq!(metrics.total_aborted, 1);
        assert_eq!(metrics.abort_rate(), 0.5);
        assert_eq!(metrics.versions_inserted, 1);
    }
}
