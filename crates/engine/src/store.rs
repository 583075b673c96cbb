//! Record store: insertion, read and cross-reference APIs
//!
//! ## Writes
//!
//! Every `put_*` call is one atomic batch:
//! 1. Validate: batch size, write windows (`Any` and empty ranges are
//!    rejected here, before anything is planned)
//! 2. Prepare items: identity and content hash
//! 3. Plan each item against a working copy of its identity's timeline
//! 4. Commit the combined batch through the coordinator
//!
//! A failed commit is returned as `TransactionFailure`; nothing of the
//! batch is visible.
//!
//! ## Reads
//!
//! Reads take a [`Referential`] and filter with its read-side predicate.
//! Variants without one use the configured default (`now` unless changed).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use tempora_core::{
    ExternalId, MutationBatch, MutationCounts, Record, RecordStorage, Referential,
    Referentialized, Source, StoredVersion, TemporaError, TemporaResult, Uid, WriteWindow,
};
use tempora_storage::MemoryStore;
use tracing::debug;

use crate::config::StoreConfig;
use crate::coordinator::{CommitCoordinator, StoreMetrics};
use crate::planner::{PreparedRecord, TimelinePlanner, WorkingTimeline};
use crate::query::Query;

/// Outcome of one insertion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    /// Identity of each item, in input order (generated ones included)
    pub uids: Vec<Uid>,
    /// Commit version; `None` when nothing had to change
    pub version: Option<u64>,
    /// Mutations applied
    pub applied: MutationCounts,
}

impl PutReceipt {
    /// True when the call changed nothing
    pub fn is_noop(&self) -> bool {
        self.version.is_none()
    }
}

/// Bitemporal record store over a storage backend
pub struct RecordStore<S: RecordStorage = MemoryStore> {
    storage: Arc<S>,
    config: StoreConfig,
    coordinator: CommitCoordinator,
}

impl RecordStore<MemoryStore> {
    /// Store over a fresh in-memory backend with default config
    pub fn in_memory() -> Self {
        RecordStore {
            storage: Arc::new(MemoryStore::new()),
            config: StoreConfig::default(),
            coordinator: CommitCoordinator::new(),
        }
    }
}

impl<S: RecordStorage> RecordStore<S> {
    /// Store over an existing backend
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid.
    pub fn new(storage: Arc<S>, config: StoreConfig) -> TemporaResult<Self> {
        config.validate()?;
        Ok(RecordStore {
            storage,
            config,
            coordinator: CommitCoordinator::new(),
        })
    }

    /// Backend handle
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Commit statistics
    pub fn metrics(&self) -> StoreMetrics {
        self.coordinator.metrics()
    }

    // =========================================================================
    // Insertion API
    // =========================================================================

    /// Insert one record
    pub fn put(&self, record: Record, referential: &Referential) -> TemporaResult<PutReceipt> {
        self.put_all(vec![record], referential)
    }

    /// Insert one record valid from now on
    pub fn put_now(&self, record: Record) -> TemporaResult<PutReceipt> {
        self.put(record, &Referential::now())
    }

    /// Insert records sharing one referential
    ///
    /// A `Now` is resolved once, so every item sees the same instant.
    pub fn put_all(
        &self,
        records: impl IntoIterator<Item = Record>,
        referential: &Referential,
    ) -> TemporaResult<PutReceipt> {
        let window = referential.resolve_write_window()?;
        let items = records.into_iter().map(|r| (r, window)).collect();
        self.write(items)
    }

    /// Insert records with a referential each, as one batch
    pub fn put_referentialized(
        &self,
        items: impl IntoIterator<Item = Referentialized>,
    ) -> TemporaResult<PutReceipt> {
        let items = items
            .into_iter()
            .map(|item| Ok((item.record, item.referential.resolve_write_window()?)))
            .collect::<TemporaResult<Vec<_>>>()?;
        self.write(items)
    }

    fn write(&self, items: Vec<(Record, WriteWindow)>) -> TemporaResult<PutReceipt> {
        if items.len() > self.config.max_batch_items {
            return Err(TemporaError::invalid_argument(format!(
                "batch of {} items exceeds max_batch_items = {}",
                items.len(),
                self.config.max_batch_items
            )));
        }

        let prepared = items
            .into_iter()
            .map(|(record, window)| Ok((PreparedRecord::prepare(record)?, window)))
            .collect::<TemporaResult<Vec<_>>>()?;

        let mut timelines: BTreeMap<Uid, WorkingTimeline> = BTreeMap::new();
        let mut batch = MutationBatch::new();
        let mut uids = Vec::with_capacity(prepared.len());

        for (item, window) in &prepared {
            let timeline = match timelines.entry(item.uid.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let snapshot = self.storage.timeline(&item.uid)?;
                    entry.insert(WorkingTimeline::from_snapshot(item.uid.clone(), snapshot))
                }
            };
            batch.extend(TimelinePlanner::plan(timeline, item, *window));
            uids.push(item.uid.clone());
        }
        for timeline in timelines.values() {
            batch.expect_revision(timeline.uid().clone(), timeline.revision());
        }

        debug!(
            target: "tempora::put",
            items = uids.len(),
            identities = timelines.len(),
            mutations = batch.len(),
            "Batch planned"
        );

        if batch.is_empty() {
            return Ok(PutReceipt {
                uids,
                version: None,
                applied: MutationCounts::default(),
            });
        }

        let receipt = self
            .coordinator
            .commit(self.storage.as_ref(), batch, self.config.transactions)?;
        Ok(PutReceipt {
            uids,
            version: Some(receipt.version),
            applied: receipt.applied,
        })
    }

    // =========================================================================
    // Read API
    // =========================================================================

    /// Version of an identity under the default referential
    pub fn find(&self, uid: &Uid) -> TemporaResult<Option<StoredVersion>> {
        self.find_at(uid, &self.config.default_referential()?)
    }

    /// Earliest-starting version of an identity matching the referential
    pub fn find_at(
        &self,
        uid: &Uid,
        referential: &Referential,
    ) -> TemporaResult<Option<StoredVersion>> {
        let versions = self
            .storage
            .lookup(std::slice::from_ref(uid), &referential.validity_filter())?;
        Ok(versions.into_iter().next())
    }

    /// Earliest-starting version matching a query (ties broken by uid)
    pub fn find_by(
        &self,
        query: &Query,
        referential: &Referential,
    ) -> TemporaResult<Option<StoredVersion>> {
        Ok(self
            .list_by(query, referential)?
            .into_iter()
            .min_by(|a, b| {
                a.validity_start()
                    .cmp(&b.validity_start())
                    .then_with(|| a.uid.cmp(&b.uid))
            }))
    }

    /// [`find_by`](Self::find_by) under the default referential
    pub fn find_by_default(&self, query: &Query) -> TemporaResult<Option<StoredVersion>> {
        self.find_by(query, &self.config.default_referential()?)
    }

    /// Versions of the identities matching the referential
    ///
    /// Ordered by uid, then validity start.
    pub fn list(&self, uids: &[Uid], referential: &Referential) -> TemporaResult<Vec<StoredVersion>> {
        self.storage.lookup(uids, &referential.validity_filter())
    }

    /// [`list`](Self::list) under the default referential
    pub fn list_default(&self, uids: &[Uid]) -> TemporaResult<Vec<StoredVersion>> {
        self.list(uids, &self.config.default_referential()?)
    }

    /// Versions matching a query and the referential
    ///
    /// Ordered by uid, then validity start.
    pub fn list_by(
        &self,
        query: &Query,
        referential: &Referential,
    ) -> TemporaResult<Vec<StoredVersion>> {
        let filter = referential.validity_filter();
        match query.uid_scope() {
            Some(scope) => {
                let uids: Vec<Uid> = scope.into_iter().collect();
                let mut versions = self.storage.lookup(&uids, &filter)?;
                versions.retain(|v| query.matches(v));
                Ok(versions)
            }
            None => self.storage.scan(&filter, &|v: &StoredVersion| query.matches(v)),
        }
    }

    /// [`list_by`](Self::list_by) under the default referential
    pub fn list_by_default(&self, query: &Query) -> TemporaResult<Vec<StoredVersion>> {
        self.list_by(query, &self.config.default_referential()?)
    }

    /// First matching version per identity
    pub fn map(
        &self,
        uids: &[Uid],
        referential: &Referential,
    ) -> TemporaResult<BTreeMap<Uid, StoredVersion>> {
        let mut mapped = BTreeMap::new();
        for version in self.list(uids, referential)? {
            mapped.entry(version.uid.clone()).or_insert(version);
        }
        Ok(mapped)
    }

    /// [`map`](Self::map) under the default referential
    pub fn map_default(&self, uids: &[Uid]) -> TemporaResult<BTreeMap<Uid, StoredVersion>> {
        self.map(uids, &self.config.default_referential()?)
    }

    /// Number of versions matching a query and the referential
    pub fn count(&self, query: &Query, referential: &Referential) -> TemporaResult<usize> {
        match query.uid_scope() {
            Some(_) => Ok(self.list_by(query, referential)?.len()),
            None => self
                .storage
                .count(&referential.validity_filter(), &|v: &StoredVersion| query.matches(v)),
        }
    }

    /// [`count`](Self::count) under the default referential
    pub fn count_default(&self, query: &Query) -> TemporaResult<usize> {
        self.count(query, &self.config.default_referential()?)
    }

    /// Every version of an identity, ordered by validity start
    pub fn history(&self, uid: &Uid) -> TemporaResult<Vec<StoredVersion>> {
        Ok(self.storage.timeline(uid)?.versions)
    }

    // =========================================================================
    // Cross-reference API
    // =========================================================================

    /// Identity carrying each external id under the referential
    ///
    /// Ids no matching version carries are absent from the result. When
    /// several identities carry one id, the smallest uid is returned.
    pub fn map_uid_by_source_ids(
        &self,
        source: &Source,
        ids: &[ExternalId],
        referential: &Referential,
    ) -> TemporaResult<BTreeMap<ExternalId, Uid>> {
        let groups =
            self.storage
                .group_uids_by_source(source, ids, &referential.validity_filter())?;
        Ok(groups
            .into_iter()
            .filter_map(|(id, uids)| uids.into_iter().next().map(|uid| (id, uid)))
            .collect())
    }

    /// [`map_uid_by_source_ids`](Self::map_uid_by_source_ids) under the
    /// default referential
    pub fn map_uid_by_source_ids_default(
        &self,
        source: &Source,
        ids: &[ExternalId],
    ) -> TemporaResult<BTreeMap<ExternalId, Uid>> {
        self.map_uid_by_source_ids(source, ids, &self.config.default_referential()?)
    }
}

impl<S: RecordStorage> std::fmt::Debug for RecordStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
