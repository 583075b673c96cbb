//! Secondary index for source lookups
//!
//! - SourceIndex: Maps (source name, external id) → Set<Uid>
//!
//! Cross-referencing external ids would otherwise scan every timeline.
//! The index only narrows the candidate identities; validity filtering
//! happens against the timelines themselves.

use rustc_hash::{FxHashMap, FxHashSet};
use tempora_core::{ExternalId, StoredVersion, Uid};

/// Secondary index: (source name, ExternalId) → identities
#[derive(Debug, Default)]
pub struct SourceIndex {
    index: FxHashMap<(String, ExternalId), FxHashSet<Uid>>,
}

impl SourceIndex {
    /// Create a new empty SourceIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Identities with at least one version carrying the id
    pub fn get(&self, source_name: &str, id: &ExternalId) -> Option<&FxHashSet<Uid>> {
        // Tuple keys cannot be borrowed piecewise
        self.index.get(&(source_name.to_string(), id.clone()))
    }

    /// Replace an identity's entries after its timeline changed
    pub fn reindex(&mut self, uid: &Uid, before: &[StoredVersion], after: &[StoredVersion]) {
        for version in before {
            for key in keys_of(version) {
                if let Some(uids) = self.index.get_mut(&key) {
                    uids.remove(uid);
                    if uids.is_empty() {
                        self.index.remove(&key);
                    }
                }
            }
        }
        for version in after {
            for key in keys_of(version) {
                self.index.entry(key).or_default().insert(uid.clone());
            }
        }
    }

    /// Number of distinct (source, id) keys
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn keys_of(version: &StoredVersion) -> impl Iterator<Item = (String, ExternalId)> + '_ {
    version
        .sources
        .iter()
        .flat_map(|(name, value)| value.ids().map(move |id| (name.to_string(), id.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempora_core::{Record, SourceIdType, SourceSet, Sourcing, Timestamp, Validity};

    fn sourced_version(uid: &str, ehr: &str) -> StoredVersion {
        let set = SourceSet::new("patient").with_source("ehr", SourceIdType::Text);
        let mut sourcing = Sourcing::new();
        sourcing.set_source_id(set.source("ehr").unwrap(), ehr).unwrap();
        let record = Record::new(serde_json::json!({"n": uid})).with_sources(sourcing);
        StoredVersion::from_record(
            Uid::new(uid),
            record.content_hash().unwrap(),
            Validity::open(Timestamp::EPOCH),
            &record,
        )
    }

    #[test]
    fn test_reindex_adds_and_removes() {
        let mut index = SourceIndex::new();
        let v1 = sourced_version("p1", "E-1");
        index.reindex(&Uid::new("p1"), &[], std::slice::from_ref(&v1));
        assert!(index
            .get("ehr", &ExternalId::from("E-1"))
            .unwrap()
            .contains(&Uid::new("p1")));

        let v2 = sourced_version("p1", "E-2");
        index.reindex(&Uid::new("p1"), &[v1], std::slice::from_ref(&v2));
        assert!(index.get("ehr", &ExternalId::from("E-1")).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_shared_id_across_identities() {
        let mut index = SourceIndex::new();
        let a = sourced_version("p1", "E-1");
        let b = sourced_version("p2", "E-1");
        index.reindex(&Uid::new("p1"), &[], std::slice::from_ref(&a));
        index.reindex(&Uid::new("p2"), &[], std::slice::from_ref(&b));
        assert_eq!(index.get("ehr", &ExternalId::from("E-1")).unwrap().len(), 2);

        index.reindex(&Uid::new("p1"), &[a], &[]);
        let remaining = index.get("ehr", &ExternalId::from("E-1")).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains(&Uid::new("p2")));
        assert!(!index.is_empty());
    }
}
