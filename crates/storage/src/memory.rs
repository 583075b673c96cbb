//! MemoryStore: in-process implementation of the storage boundary
//!
//! This module implements `RecordStorage` using:
//! - `FxHashMap<Uid, IdentityTimeline>` for per-identity version timelines
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for the store-wide commit version
//! - A source index for external id lookups
//!
//! # Design Notes
//!
//! - **Atomic batches**: a batch is applied to staged copies of the touched
//!   timelines; the copies are validated and swapped in under one write lock.
//!   A rejected batch leaves no trace.
//! - **Revisions**: every timeline carries a revision bumped on each commit
//!   touching it. Batches record the revision they were planned against,
//!   giving first-committer-wins semantics per identity.
//! - **Indices**: timelines and the source index live behind the same lock
//!   and are updated together.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use tempora_core::{
    CommitReceipt, ExternalId, IndexSpec, MutationBatch, MutationCounts, RecordStorage, Source,
    StoredVersion, TemporaError, TemporaResult, TimelineSnapshot, TransactionFailureReason, Uid,
    ValidityFilter,
};

use crate::index::SourceIndex;
use crate::timeline::IdentityTimeline;

#[derive(Debug, Default)]
struct StoreState {
    timelines: FxHashMap<Uid, IdentityTimeline>,
    source_index: SourceIndex,
}

/// In-memory record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    /// Store-wide commit counter
    version: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Version of the last committed batch (0 before any commit)
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Number of identities ever written
    pub fn identity_count(&self) -> usize {
        self.state.read().timelines.len()
    }

    /// Total number of stored versions
    pub fn version_count(&self) -> usize {
        self.state
            .read()
            .timelines
            .values()
            .map(|t| t.versions().len())
            .sum()
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn collect_sorted<'a>(
        timelines: impl Iterator<Item = &'a IdentityTimeline>,
        keep: impl Fn(&StoredVersion) -> bool,
    ) -> Vec<StoredVersion> {
        let mut out: Vec<StoredVersion> = timelines
            .flat_map(|t| t.versions().iter())
            .filter(|v| keep(*v))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.uid
                .cmp(&b.uid)
                .then_with(|| a.validity.start.cmp(&b.validity.start))
        });
        out
    }
}

fn reject(reason: TransactionFailureReason, message: String) -> TemporaError {
    debug!(target: "tempora::storage", %reason, %message, "Batch rejected");
    TemporaError::transaction_failure(reason, message)
}

impl RecordStorage for MemoryStore {
    fn timeline(&self, uid: &Uid) -> TemporaResult<TimelineSnapshot> {
        let state = self.state.read();
        Ok(state
            .timelines
            .get(uid)
            .map(IdentityTimeline::snapshot)
            .unwrap_or_default())
    }

    fn lookup(&self, uids: &[Uid], filter: &ValidityFilter) -> TemporaResult<Vec<StoredVersion>> {
        let wanted: BTreeSet<&Uid> = uids.iter().collect();
        let state = self.state.read();
        let timelines = wanted.into_iter().filter_map(|uid| state.timelines.get(uid));
        Ok(Self::collect_sorted(timelines, |v| filter.matches(&v.validity)))
    }

    fn scan(
        &self,
        filter: &ValidityFilter,
        predicate: &dyn Fn(&StoredVersion) -> bool,
    ) -> TemporaResult<Vec<StoredVersion>> {
        let state = self.state.read();
        Ok(Self::collect_sorted(state.timelines.values(), |v| {
            filter.matches(&v.validity) && predicate(v)
        }))
    }

    fn count(
        &self,
        filter: &ValidityFilter,
        predicate: &dyn Fn(&StoredVersion) -> bool,
    ) -> TemporaResult<usize> {
        let state = self.state.read();
        Ok(state
            .timelines
            .values()
            .flat_map(|t| t.versions().iter())
            .filter(|v| filter.matches(&v.validity) && predicate(*v))
            .count())
    }

    fn apply(&self, batch: MutationBatch, validate_revisions: bool) -> TemporaResult<CommitReceipt> {
        let (mutations, expected) = batch.into_parts();
        let mut state = self.state.write();

        if validate_revisions {
            for (uid, revision) in &expected {
                let current = state.timelines.get(uid).map_or(0, IdentityTimeline::revision);
                if current != *revision {
                    return Err(reject(
                        TransactionFailureReason::Conflict,
                        format!(
                            "timeline of {} moved from revision {} to {}",
                            uid, revision, current
                        ),
                    ));
                }
            }
        }

        // Nothing to write: report the last committed version
        if mutations.is_empty() {
            return Ok(CommitReceipt {
                version: self.current_version(),
                applied: MutationCounts::default(),
            });
        }

        // Stage copies; nothing below touches `state` until every check passed
        let mut staged: BTreeMap<Uid, IdentityTimeline> = BTreeMap::new();
        for mutation in &mutations {
            let timeline = staged.entry(mutation.uid().clone()).or_insert_with(|| {
                state
                    .timelines
                    .get(mutation.uid())
                    .cloned()
                    .unwrap_or_default()
            });
            timeline
                .apply(mutation)
                .map_err(|(reason, message)| reject(reason, message))?;
        }
        for timeline in staged.values_mut() {
            timeline
                .seal()
                .map_err(|(reason, message)| reject(reason, message))?;
        }

        let version = self.next_version();
        let state = &mut *state;
        for (uid, mut timeline) in staged {
            timeline.bump();
            let before = state
                .timelines
                .get(&uid)
                .map(|t| t.versions())
                .unwrap_or(&[]);
            state
                .source_index
                .reindex(&uid, before, timeline.versions());
            state.timelines.insert(uid, timeline);
        }

        let applied = MutationCounts::of(&mutations);
        trace!(
            target: "tempora::storage",
            version,
            removed = applied.removed,
            updated = applied.updated,
            inserted = applied.inserted,
            "Batch applied"
        );
        Ok(CommitReceipt { version, applied })
    }

    fn group_uids_by_source(
        &self,
        source: &Source,
        ids: &[ExternalId],
        filter: &ValidityFilter,
    ) -> TemporaResult<BTreeMap<ExternalId, BTreeSet<Uid>>> {
        let state = self.state.read();
        let mut groups: BTreeMap<ExternalId, BTreeSet<Uid>> = BTreeMap::new();
        for id in ids {
            let Some(candidates) = state.source_index.get(source.name(), id) else {
                continue;
            };
            for uid in candidates {
                let Some(timeline) = state.timelines.get(uid) else {
                    continue;
                };
                let hit = timeline
                    .versions()
                    .iter()
                    .any(|v| filter.matches(&v.validity) && v.sources.matches(source, id));
                if hit {
                    groups.entry(id.clone()).or_default().insert(uid.clone());
                }
            }
        }
        Ok(groups)
    }

    fn index_specs(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::new("uid", vec!["uid"]),
            IndexSpec::new("hash", vec!["hash"]),
            IndexSpec::new("validity_start", vec!["validity_start"]),
            IndexSpec::new("validity_end", vec!["validity_end"]),
            IndexSpec::new("validity", vec!["validity_start", "validity_end"]),
            IndexSpec::new("sources", vec!["sources.<name>"]),
            IndexSpec::unique("uid_validity_start", vec!["uid", "validity_start"]),
            IndexSpec::unique("uid_hash_validity_start", vec!["uid", "hash", "validity_start"]),
        ]
    }
}
