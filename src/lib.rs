//! Tempora - bitemporal record versioning
//!
//! Tempora keeps every historical state of a record. Each write says when
//! the new content becomes valid (a [`Referential`]); the store closes,
//! truncates or removes the versions it supersedes so that, for any
//! identity, at most one version is valid at any instant.
//!
//! # Quick Start
//!
//! ```ignore
//! use tempora::{Record, RecordStore, Referential, Timestamp};
//!
//! let store = RecordStore::in_memory();
//!
//! let birth = Timestamp::parse_rfc3339("2001-01-01T00:00:00Z")?;
//! store.put(Record::new(json!({"name": "Arnold"})).with_uid("p1"), &Referential::at(birth))?;
//!
//! let rename = Timestamp::parse_rfc3339("2020-01-01T00:00:00Z")?;
//! store.put(Record::new(json!({"name": "Bernard"})).with_uid("p1"), &Referential::at(rename))?;
//!
//! // "Bernard" now, "Arnold" in 2010
//! let current = store.find(&"p1".into())?;
//! ```
//!
//! # Architecture
//!
//! - `tempora-core`: value types, referentials, hashing, the storage trait
//! - `tempora-storage`: the in-memory storage backend
//! - `tempora-engine`: insertion planning and the record store API

pub use tempora_core::{
    canonical_bytes, content_hash, Cardinality, CommitReceipt, ContentHash, ExternalId, IndexSpec,
    Mutation, MutationBatch, MutationCounts, MutationKind, NowPoint, Record, RecordId,
    RecordStorage, Referential, ReferentialKind, Referentialized, Source, SourceIdType,
    SourceRegister, SourceRegisterBuilder, SourceSet, SourceValue, Sourcing, StoredVersion,
    TemporaError, TemporaResult, TimelineSnapshot, Timestamp, TransactionFailureReason, Uid,
    Validity, ValidityFilter, Value, WriteWindow,
};
pub use tempora_engine::{
    PutReceipt, Query, RecordStore, StoreConfig, StoreMetrics, TimelinePlanner, CONFIG_FILE_NAME,
};
pub use tempora_storage::MemoryStore;
