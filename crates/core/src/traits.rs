//! Storage boundary
//!
//! The temporal core needs very little from a persistence engine: atomic
//! batch execution, the two compound uniqueness constraints, lookups by
//! identity and validity, and grouping by an external identifier. This
//! trait is that contract, so the in-memory store can be swapped for a
//! real engine without touching the insertion planner.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::TemporaResult;
use crate::filter::ValidityFilter;
use crate::mutation::{CommitReceipt, MutationBatch, TimelineSnapshot};
use crate::record::StoredVersion;
use crate::source::{ExternalId, Source};
use crate::uid::Uid;

/// Description of one index the store maintains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name
    pub name: &'static str,
    /// Indexed fields, in order
    pub fields: Vec<&'static str>,
    /// Rejects duplicate keys
    pub unique: bool,
}

impl IndexSpec {
    /// Non-unique index
    pub fn new(name: &'static str, fields: Vec<&'static str>) -> Self {
        IndexSpec {
            name,
            fields,
            unique: false,
        }
    }

    /// Unique index
    pub fn unique(name: &'static str, fields: Vec<&'static str>) -> Self {
        IndexSpec {
            name,
            fields,
            unique: true,
        }
    }
}

/// Persistence contract required by the record store
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait RecordStorage: Send + Sync {
    /// Current versions and revision of one identity
    ///
    /// An unknown identity yields an empty snapshot at revision 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn timeline(&self, uid: &Uid) -> TemporaResult<TimelineSnapshot>;

    /// Versions of the given identities passing the validity filter
    ///
    /// Results are ordered by identity, then by `validity.start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn lookup(&self, uids: &[Uid], filter: &ValidityFilter) -> TemporaResult<Vec<StoredVersion>>;

    /// Every version passing both the validity filter and the predicate
    ///
    /// Results are ordered by identity, then by `validity.start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn scan(
        &self,
        filter: &ValidityFilter,
        predicate: &dyn Fn(&StoredVersion) -> bool,
    ) -> TemporaResult<Vec<StoredVersion>>;

    /// Number of versions passing both the validity filter and the predicate
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn count(
        &self,
        filter: &ValidityFilter,
        predicate: &dyn Fn(&StoredVersion) -> bool,
    ) -> TemporaResult<usize> {
        Ok(self.scan(filter, predicate)?.len())
    }

    /// Apply a batch atomically
    ///
    /// Either every mutation becomes visible or none does. When
    /// `validate_revisions` is set, the batch is rejected if any identity's
    /// revision differs from the one recorded in the batch.
    ///
    /// # Errors
    ///
    /// `TransactionFailure` on revision conflicts, uniqueness violations,
    /// empty intervals or references to versions that no longer exist.
    fn apply(&self, batch: MutationBatch, validate_revisions: bool) -> TemporaResult<CommitReceipt>;

    /// Identities whose versions carry each external id for a source
    ///
    /// Only versions passing the validity filter are considered. Ids with
    /// no match are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn group_uids_by_source(
        &self,
        source: &Source,
        ids: &[ExternalId],
        filter: &ValidityFilter,
    ) -> TemporaResult<BTreeMap<ExternalId, BTreeSet<Uid>>>;

    /// Indexes maintained by this store
    fn index_specs(&self) -> Vec<IndexSpec>;
}
