//! Per-identity version timeline
//!
//! Commits stage a copy of every touched timeline, apply mutations to the
//! copy and validate it before anything becomes visible.

use std::collections::HashSet;

use tempora_core::{
    ContentHash, Mutation, RecordId, StoredVersion, Timestamp, TimelineSnapshot,
    TransactionFailureReason, Uid,
};

/// Why a staged timeline was rejected
pub(crate) type Rejection = (TransactionFailureReason, String);

/// All versions of one identity plus its revision counter
#[derive(Debug, Clone, Default)]
pub struct IdentityTimeline {
    revision: u64,
    versions: Vec<StoredVersion>,
}

impl IdentityTimeline {
    /// Empty timeline at revision 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed batches that touched this identity
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Versions ordered by `validity.start`
    pub fn versions(&self) -> &[StoredVersion] {
        &self.versions
    }

    /// No versions left
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Owned copy for callers outside the lock
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            revision: self.revision,
            versions: self.versions.clone(),
        }
    }

    /// Apply one mutation to this (staged) timeline
    ///
    /// A mutation referring to a version that does not exist means the
    /// batch was planned against a state that is gone.
    pub(crate) fn apply(&mut self, mutation: &Mutation) -> Result<(), Rejection> {
        match mutation {
            Mutation::Remove { uid, id } => {
                let pos = self.position(id).ok_or_else(|| stale(uid, id))?;
                self.versions.remove(pos);
            }
            Mutation::SetValidity { uid, id, validity } => {
                let pos = self.position(id).ok_or_else(|| stale(uid, id))?;
                self.versions[pos].validity = *validity;
            }
            Mutation::Insert(version) => {
                if self.position(&version.id).is_some() {
                    return Err((
                        TransactionFailureReason::UniqueViolation,
                        format!("version {} of {} already exists", version.id, version.uid),
                    ));
                }
                self.versions.push(version.clone());
            }
        }
        Ok(())
    }

    /// Restore ordering and check every invariant the store enforces
    ///
    /// - no empty interval
    /// - `(uid, validity_start)` unique
    /// - `(uid, content_hash, validity_start)` unique
    /// - no two versions overlap
    pub(crate) fn seal(&mut self) -> Result<(), Rejection> {
        self.versions.sort_by_key(|v| v.validity.start);

        let mut starts: HashSet<Timestamp> = HashSet::with_capacity(self.versions.len());
        let mut hashed_starts: HashSet<(&ContentHash, Timestamp)> =
            HashSet::with_capacity(self.versions.len());
        for v in &self.versions {
            if v.validity.is_empty() {
                return Err((
                    TransactionFailureReason::InvalidInterval,
                    format!("version {} of {} would be {}", v.id, v.uid, v.validity),
                ));
            }
            if !hashed_starts.insert((&v.hash, v.validity.start)) {
                return Err((
                    TransactionFailureReason::UniqueViolation,
                    format!(
                        "duplicate (uid, hash, validity_start) = ({}, {}, {})",
                        v.uid, v.hash, v.validity.start
                    ),
                ));
            }
            if !starts.insert(v.validity.start) {
                return Err((
                    TransactionFailureReason::UniqueViolation,
                    format!(
                        "duplicate (uid, validity_start) = ({}, {})",
                        v.uid, v.validity.start
                    ),
                ));
            }
        }

        for pair in self.versions.windows(2) {
            if pair[0].validity.overlaps(&pair[1].validity) {
                return Err((
                    TransactionFailureReason::Overlap,
                    format!(
                        "versions {} {} and {} {} of {} overlap",
                        pair[0].id, pair[0].validity, pair[1].id, pair[1].validity, pair[0].uid
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Mark a committed change
    pub(crate) fn bump(&mut self) {
        self.revision += 1;
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.versions.iter().position(|v| v.id == *id)
    }
}

fn stale(uid: &Uid, id: &RecordId) -> Rejection {
    (
        TransactionFailureReason::Conflict,
        format!("version {} of {} no longer exists", id, uid),
    )
}
