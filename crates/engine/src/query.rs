//! Read-side queries over stored versions
//!
//! A [`Query`] selects versions by identity, content or source ids. The
//! temporal side of a read is never part of the query: it comes from the
//! `Referential` passed next to it.

use std::collections::BTreeSet;

use tempora_core::{ContentHash, ExternalId, RecordId, Source, StoredVersion, Uid, Value};

/// Selection of stored versions
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every version
    All,
    /// Versions of one identity
    Uid(Uid),
    /// Versions of any of the identities
    UidIn(Vec<Uid>),
    /// One version by row id
    Id(RecordId),
    /// Versions with this content hash
    Hash(ContentHash),
    /// Payload field equals a value; `field` may be a dotted path
    FieldEq {
        /// Field path inside the payload
        field: String,
        /// Expected value
        value: Value,
    },
    /// Versions carrying an external id for a source
    Source {
        /// Source descriptor
        source: Source,
        /// External id
        id: ExternalId,
    },
    /// Every sub-query matches
    And(Vec<Query>),
}

impl Query {
    /// Versions of one identity
    pub fn uid(uid: impl Into<Uid>) -> Self {
        Query::Uid(uid.into())
    }

    /// Payload field equality
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::FieldEq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Source id match
    pub fn source(source: &Source, id: impl Into<ExternalId>) -> Self {
        Query::Source {
            source: source.clone(),
            id: id.into(),
        }
    }

    /// Combine with another query
    pub fn and(self, other: Query) -> Self {
        match self {
            Query::And(mut parts) => {
                parts.push(other);
                Query::And(parts)
            }
            Query::All => other,
            first => Query::And(vec![first, other]),
        }
    }

    /// Does a version satisfy the query
    pub fn matches(&self, version: &StoredVersion) -> bool {
        match self {
            Query::All => true,
            Query::Uid(uid) => version.uid == *uid,
            Query::UidIn(uids) => uids.contains(&version.uid),
            Query::Id(id) => version.id == *id,
            Query::Hash(hash) => version.hash == *hash,
            Query::FieldEq { field, value } => {
                field_at(&version.payload, field).is_some_and(|v| v == value)
            }
            Query::Source { source, id } => version.sources.matches(source, id),
            Query::And(parts) => parts.iter().all(|q| q.matches(version)),
        }
    }

    /// Identities the query is restricted to, if any
    ///
    /// Reads use this to look timelines up directly instead of scanning
    /// the whole store. `None` means unrestricted.
    pub fn uid_scope(&self) -> Option<BTreeSet<Uid>> {
        match self {
            Query::Uid(uid) => Some(BTreeSet::from([uid.clone()])),
            Query::UidIn(uids) => Some(uids.iter().cloned().collect()),
            Query::And(parts) => parts
                .iter()
                .filter_map(Query::uid_scope)
                .reduce(|acc, scope| acc.intersection(&scope).cloned().collect()),
            _ => None,
        }
    }
}

/// Follow a dotted path through nested objects
fn field_at<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |value, key| value.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempora_core::{Record, SourceIdType, Sourcing, Timestamp, Validity};

    fn version(uid: &str, payload: serde_json::Value) -> StoredVersion {
        let record = Record::new(payload);
        StoredVersion::from_record(
            Uid::new(uid),
            record.content_hash().unwrap(),
            Validity::open(Timestamp::EPOCH),
            &record,
        )
    }

    #[test]
    fn test_field_eq_follows_paths() {
        let v = version("p1", json!({"name": "Meuh", "address": {"city": "Lyon"}}));
        assert!(Query::field_eq("name", "Meuh").matches(&v));
        assert!(Query::field_eq("address.city", "Lyon").matches(&v));
        assert!(!Query::field_eq("address.zip", "69000").matches(&v));
        assert!(!Query::field_eq("name", 3i64).matches(&v));
    }

    #[test]
    fn test_source_and_hash() {
        let ehr = Source::single("patient", "ehr", SourceIdType::Int);
        let mut sourcing = Sourcing::new();
        sourcing.set_source_id(&ehr, 42i64).unwrap();
        let record = Record::new(json!({"name": "Meuh"})).with_sources(sourcing);
        let hash = record.content_hash().unwrap();
        let v = StoredVersion::from_record(
            Uid::new("p1"),
            hash.clone(),
            Validity::open(Timestamp::EPOCH),
            &record,
        );

        assert!(Query::source(&ehr, 42i64).matches(&v));
        assert!(!Query::source(&ehr, 43i64).matches(&v));
        assert!(Query::Hash(hash).matches(&v));
        assert!(Query::Id(v.id).matches(&v));
    }

    #[test]
    fn test_and_combines() {
        let v = version("p1", json!({"name": "Meuh"}));
        let q = Query::uid("p1").and(Query::field_eq("name", "Meuh"));
        assert!(q.matches(&v));
        assert!(!q.clone().and(Query::uid("p2")).matches(&v));
        assert_eq!(Query::All.and(Query::uid("p1")), Query::uid("p1"));
    }

    #[test]
    fn test_uid_scope() {
        assert_eq!(Query::All.uid_scope(), None);
        assert_eq!(Query::field_eq("a", 1i64).uid_scope(), None);

        let scoped = Query::UidIn(vec![Uid::new("a"), Uid::new("b")])
            .and(Query::uid("b"))
            .and(Query::field_eq("x", 1i64));
        assert_eq!(scoped.uid_scope(), Some(BTreeSet::from([Uid::new("b")])));
    }
}
