//! Store mutations and atomic batches
//!
//! The insertion planner never touches storage directly: it emits an
//! ordered [`MutationBatch`] that the store applies as one unit.

use std::collections::{BTreeMap, BTreeSet};

use crate::interval::Validity;
use crate::record::StoredVersion;
use crate::uid::{RecordId, Uid};

/// One change to a stored timeline
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Evict a version entirely
    Remove {
        /// Owning identity
        uid: Uid,
        /// Version to evict
        id: RecordId,
    },
    /// Move the bounds of an existing version
    SetValidity {
        /// Owning identity
        uid: Uid,
        /// Version to adjust
        id: RecordId,
        /// New bounds
        validity: Validity,
    },
    /// Add a new version
    Insert(StoredVersion),
}

/// Kind of a [`Mutation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// `Remove`
    Remove,
    /// `SetValidity`
    SetValidity,
    /// `Insert`
    Insert,
}

impl Mutation {
    /// Identity the mutation applies to
    pub fn uid(&self) -> &Uid {
        match self {
            Mutation::Remove { uid, .. } | Mutation::SetValidity { uid, .. } => uid,
            Mutation::Insert(version) => &version.uid,
        }
    }

    /// Which kind of mutation this is
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Remove { .. } => MutationKind::Remove,
            Mutation::SetValidity { .. } => MutationKind::SetValidity,
            Mutation::Insert(_) => MutationKind::Insert,
        }
    }
}

/// Per-kind mutation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationCounts {
    /// Versions evicted
    pub removed: u64,
    /// Versions whose bounds moved
    pub updated: u64,
    /// Versions added
    pub inserted: u64,
}

impl MutationCounts {
    /// Count one mutation
    pub fn record(&mut self, kind: MutationKind) {
        match kind {
            MutationKind::Remove => self.removed += 1,
            MutationKind::SetValidity => self.updated += 1,
            MutationKind::Insert => self.inserted += 1,
        }
    }

    /// Counts for a sequence of mutations
    pub fn of<'a>(mutations: impl IntoIterator<Item = &'a Mutation>) -> Self {
        let mut counts = MutationCounts::default();
        for m in mutations {
            counts.record(m.kind());
        }
        counts
    }

    /// Total number of mutations
    pub fn total(&self) -> u64 {
        self.removed + self.updated + self.inserted
    }
}

/// Ordered mutations applied all-or-nothing
///
/// `expected_revisions` records, for every identity the batch was planned
/// against, the timeline revision the planner saw. A store validating
/// revisions rejects the batch if any of them moved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
    expected_revisions: BTreeMap<Uid, u64>,
}

impl MutationBatch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the revision an identity was planned against
    ///
    /// The first expectation recorded for an identity wins.
    pub fn expect_revision(&mut self, uid: Uid, revision: u64) {
        self.expected_revisions.entry(uid).or_insert(revision);
    }

    /// Append a mutation
    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Append several mutations
    pub fn extend(&mut self, mutations: impl IntoIterator<Item = Mutation>) {
        self.mutations.extend(mutations);
    }

    /// Mutations in application order
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Planned-against revisions
    pub fn expected_revisions(&self) -> &BTreeMap<Uid, u64> {
        &self.expected_revisions
    }

    /// Every identity the batch touches or was planned against
    pub fn touched_uids(&self) -> BTreeSet<Uid> {
        self.expected_revisions
            .keys()
            .cloned()
            .chain(self.mutations.iter().map(|m| m.uid().clone()))
            .collect()
    }

    /// Number of mutations
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// No mutations
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Split into mutations and expectations
    pub fn into_parts(self) -> (Vec<Mutation>, BTreeMap<Uid, u64>) {
        (self.mutations, self.expected_revisions)
    }
}

/// Versions of one identity plus its revision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineSnapshot {
    /// Bumped on every committed batch touching the identity; 0 if never written
    pub revision: u64,
    /// Versions ordered by `validity.start`
    pub versions: Vec<StoredVersion>,
}

/// Outcome of a committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Store-wide commit version
    pub version: u64,
    /// What was applied
    pub applied: MutationCounts,
}
