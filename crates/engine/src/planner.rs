//! Temporal insertion planner
//!
//! Given one item (identity + content hash) and the window it becomes valid
//! in, computes the mutations that keep the identity's timeline a sequence
//! of non-overlapping intervals.
//!
//! ## Point write at `t` (`Now` / `At`)
//!
//! 1. Different-hash versions starting at or after `t` are removed.
//! 2. Different-hash versions valid across `t` end at `t`.
//! 3. The earliest same-hash version that is open or ends at or after `t`
//!    becomes `[min(start, t), ∞)`; later same-hash candidates are folded
//!    into it. Without a candidate a new `[t, ∞)` version is inserted.
//!
//! ## Range write over `[from, to)` (`Between`)
//!
//! 1. Different-hash versions inside `[from, to]` are removed.
//! 2. Different-hash versions valid across `from` end at `from`.
//! 3. Remaining different-hash versions valid across `to` start at `to`.
//! 4. Same-hash versions touching `[from, to]` are merged with the window
//!    into one version spanning their hull. Without a candidate a new
//!    `[from, to)` version is inserted.
//!
//! A version straddling the whole range keeps only its head: the fragment
//! after `to` is discarded (earliest fragment wins).
//!
//! The planner works on a [`WorkingTimeline`] and applies its own output to
//! it, so several items of one batch touching the same identity see each
//! other's effects.

use smallvec::SmallVec;
use tracing::trace;

use tempora_core::{
    ContentHash, Mutation, Overlap, Record, StoredVersion, TemporaResult, TimelineSnapshot,
    Timestamp, Uid, Validity, WriteWindow,
};

/// A record with its identity and content hash resolved
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    /// Identity (generated when the record had none)
    pub uid: Uid,
    /// Canonical content hash
    pub hash: ContentHash,
    /// Original record
    pub record: Record,
}

impl PreparedRecord {
    /// Resolve identity and hash
    pub fn prepare(record: Record) -> TemporaResult<Self> {
        let hash = record.content_hash()?;
        let uid = record.uid.clone().unwrap_or_else(Uid::generate);
        Ok(PreparedRecord { uid, hash, record })
    }
}

/// Mutable copy of one identity's timeline used while planning a batch
#[derive(Debug, Clone)]
pub struct WorkingTimeline {
    uid: Uid,
    revision: u64,
    versions: Vec<StoredVersion>,
}

impl WorkingTimeline {
    /// Start from a stored snapshot
    pub fn from_snapshot(uid: Uid, snapshot: TimelineSnapshot) -> Self {
        WorkingTimeline {
            uid,
            revision: snapshot.revision,
            versions: snapshot.versions,
        }
    }

    /// Identity
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Revision of the snapshot this copy started from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current versions, ordered by start
    pub fn versions(&self) -> &[StoredVersion] {
        &self.versions
    }

    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Remove { id, .. } => self.versions.retain(|v| v.id != *id),
            Mutation::SetValidity { id, validity, .. } => {
                if let Some(v) = self.versions.iter_mut().find(|v| v.id == *id) {
                    v.validity = *validity;
                }
            }
            Mutation::Insert(version) => self.versions.push(version.clone()),
        }
        self.versions.sort_by_key(|v| v.validity.start);
    }
}

/// Computes insertion mutations
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelinePlanner;

impl TimelinePlanner {
    /// Plan one item against a working timeline and apply the result to it
    pub fn plan(
        timeline: &mut WorkingTimeline,
        item: &PreparedRecord,
        window: WriteWindow,
    ) -> Vec<Mutation> {
        let mutations = match window {
            WriteWindow::Point(at) => Self::plan_point(timeline, item, at),
            WriteWindow::Range { from, to } => Self::plan_range(timeline, item, from, to),
        };
        for mutation in &mutations {
            timeline.apply(mutation);
        }
        trace!(
            target: "tempora::put",
            uid = %item.uid,
            hash = %item.hash,
            ?window,
            mutations = mutations.len(),
            "Planned insertion"
        );
        mutations
    }

    fn plan_point(timeline: &WorkingTimeline, item: &PreparedRecord, at: Timestamp) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        let mut candidates: SmallVec<[&StoredVersion; 4]> = SmallVec::new();

        for version in &timeline.versions {
            if version.hash == item.hash {
                if version.validity.touches_point(at) {
                    candidates.push(version);
                }
            } else {
                push_overlap(&mut mutations, version, version.validity.classify_point(at));
            }
        }

        match candidates.split_first() {
            Some((keep, folded)) => {
                let widened = Validity::open(keep.validity.start.min(at));
                merge_into(&mut mutations, keep, folded, widened);
            }
            None => mutations.push(Mutation::Insert(new_version(item, Validity::open(at)))),
        }
        mutations
    }

    fn plan_range(
        timeline: &WorkingTimeline,
        item: &PreparedRecord,
        from: Timestamp,
        to: Timestamp,
    ) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        let mut candidates: SmallVec<[&StoredVersion; 4]> = SmallVec::new();

        for version in &timeline.versions {
            if version.hash == item.hash {
                if version.validity.touches_range(from, to) {
                    candidates.push(version);
                }
            } else {
                push_overlap(&mut mutations, version, version.validity.classify_range(from, to));
            }
        }

        let window = Validity::closed(from, to);
        match candidates.split_first() {
            Some((keep, folded)) => {
                let hull = candidates
                    .iter()
                    .fold(window, |acc, v| acc.hull(&v.validity));
                merge_into(&mut mutations, keep, folded, hull);
            }
            None => mutations.push(Mutation::Insert(new_version(item, window))),
        }
        mutations
    }
}

/// Turn an overlap outcome into at most one mutation
fn push_overlap(mutations: &mut Vec<Mutation>, version: &StoredVersion, overlap: Overlap) {
    match overlap.apply(version.validity) {
        None => mutations.push(Mutation::Remove {
            uid: version.uid.clone(),
            id: version.id,
        }),
        Some(validity) if validity != version.validity => mutations.push(Mutation::SetValidity {
            uid: version.uid.clone(),
            id: version.id,
            validity,
        }),
        Some(_) => {}
    }
}

/// Widen `keep` to `validity` and drop the same-hash versions it absorbs
///
/// `keep` is the earliest-starting candidate, so every folded version
/// lies inside the widened interval.
fn merge_into(
    mutations: &mut Vec<Mutation>,
    keep: &StoredVersion,
    folded: &[&StoredVersion],
    validity: Validity,
) {
    for version in folded {
        mutations.push(Mutation::Remove {
            uid: version.uid.clone(),
            id: version.id,
        });
    }
    if validity != keep.validity {
        mutations.push(Mutation::SetValidity {
            uid: keep.uid.clone(),
            id: keep.id,
            validity,
        });
    }
}

fn new_version(item: &PreparedRecord, validity: Validity) -> StoredVersion {
    StoredVersion::from_record(item.uid.clone(), item.hash.clone(), validity, &item.record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempora_core::MutationKind;

    fn day(n: i64) -> Timestamp {
        Timestamp::from_secs(n * 86_400)
    }

    fn item(name: &str) -> PreparedRecord {
        PreparedRecord::prepare(Record::new(json!({ "name": name })).with_uid("p1")).unwrap()
    }

    fn empty() -> WorkingTimeline {
        WorkingTimeline::from_snapshot(Uid::new("p1"), TimelineSnapshot::default())
    }

    fn layout(timeline: &WorkingTimeline) -> Vec<(Validity, String)> {
        timeline
            .versions()
            .iter()
            .map(|v| {
                let name = v.payload.get("name").and_then(|n| n.as_str()).unwrap_or("");
                (v.validity, name.to_string())
            })
            .collect()
    }

    fn kinds(mutations: &[Mutation]) -> Vec<MutationKind> {
        mutations.iter().map(Mutation::kind).collect()
    }

    #[test]
    fn test_prepare_generates_uid_when_absent() {
        let prepared = PreparedRecord::prepare(Record::new(json!({"a": 1}))).unwrap();
        assert!(!prepared.uid.as_str().is_empty());
        assert_eq!(prepared.hash, prepared.record.content_hash().unwrap());
    }

    #[test]
    fn test_point_insert_into_empty_timeline() {
        let mut tl = empty();
        let m = TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(1)));
        assert_eq!(kinds(&m), vec![MutationKind::Insert]);
        assert_eq!(layout(&tl), vec![(Validity::open(day(1)), "a".into())]);
    }

    #[test]
    fn test_point_truncates_previous_version() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(0)));
        let m = TimelinePlanner::plan(&mut tl, &item("b"), WriteWindow::Point(day(5)));
        assert_eq!(kinds(&m), vec![MutationKind::SetValidity, MutationKind::Insert]);
        assert_eq!(
            layout(&tl),
            vec![
                (Validity::closed(day(0), day(5)), "a".into()),
                (Validity::open(day(5)), "b".into()),
            ]
        );
    }

    #[test]
    fn test_point_same_hash_is_idempotent() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(3)));
        let later = TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(7)));
        assert!(later.is_empty());
        let earlier = TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(1)));
        assert_eq!(kinds(&earlier), vec![MutationKind::SetValidity]);
        assert_eq!(layout(&tl), vec![(Validity::open(day(1)), "a".into())]);
    }

    #[test]
    fn test_point_at_same_instant_replaces() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(1)));
        let m = TimelinePlanner::plan(&mut tl, &item("b"), WriteWindow::Point(day(1)));
        assert_eq!(kinds(&m), vec![MutationKind::Remove, MutationKind::Insert]);
        assert_eq!(layout(&tl), vec![(Validity::open(day(1)), "b".into())]);
    }

    #[test]
    fn test_point_folds_multiple_same_hash_candidates() {
        // a [0,2) b [2,4) a [4,∞): writing a at 2 folds both a's together
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(0)));
        TimelinePlanner::plan(&mut tl, &item("b"), WriteWindow::Point(day(2)));
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(4)));
        assert_eq!(tl.versions().len(), 3);

        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(2)));
        assert_eq!(layout(&tl), vec![(Validity::open(day(0)), "a".into())]);
    }

    #[test]
    fn test_range_straddler_keeps_head_only() {
        let mut tl = empty();
        TimelinePlanner::plan(
            &mut tl,
            &item("a"),
            WriteWindow::Range { from: day(0), to: day(30) },
        );
        TimelinePlanner::plan(
            &mut tl,
            &item("b"),
            WriteWindow::Range { from: day(10), to: day(20) },
        );
        assert_eq!(
            layout(&tl),
            vec![
                (Validity::closed(day(0), day(10)), "a".into()),
                (Validity::closed(day(10), day(20)), "b".into()),
            ]
        );
    }

    #[test]
    fn test_range_truncates_both_neighbours() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Range { from: day(0), to: day(10) });
        TimelinePlanner::plan(&mut tl, &item("c"), WriteWindow::Range { from: day(10), to: day(20) });
        let m = TimelinePlanner::plan(
            &mut tl,
            &item("b"),
            WriteWindow::Range { from: day(5), to: day(15) },
        );
        assert_eq!(
            kinds(&m),
            vec![MutationKind::SetValidity, MutationKind::SetValidity, MutationKind::Insert]
        );
        assert_eq!(
            layout(&tl),
            vec![
                (Validity::closed(day(0), day(5)), "a".into()),
                (Validity::closed(day(5), day(15)), "b".into()),
                (Validity::closed(day(15), day(20)), "c".into()),
            ]
        );
    }

    #[test]
    fn test_range_merges_adjacent_same_hash() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Range { from: day(0), to: day(5) });
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Range { from: day(10), to: day(15) });
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Range { from: day(5), to: day(10) });
        assert_eq!(layout(&tl), vec![(Validity::closed(day(0), day(15)), "a".into())]);
    }

    #[test]
    fn test_range_keeps_open_end_open() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(5)));
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Range { from: day(1), to: day(6) });
        assert_eq!(layout(&tl), vec![(Validity::open(day(1)), "a".into())]);
    }

    #[test]
    fn test_range_over_open_version_discards_tail() {
        let mut tl = empty();
        TimelinePlanner::plan(&mut tl, &item("a"), WriteWindow::Point(day(0)));
        TimelinePlanner::plan(&mut tl, &item("b"), WriteWindow::Range { from: day(3), to: day(6) });
        assert_eq!(
            layout(&tl),
            vec![
                (Validity::closed(day(0), day(3)), "a".into()),
                (Validity::closed(day(3), day(6)), "b".into()),
            ]
        );
    }
}
