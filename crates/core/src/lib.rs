//! Core types and traits for tempora
//!
//! This crate defines the pure building blocks of bitemporal versioning:
//! - Timestamp: signed microsecond instants
//! - Referential: temporal mode of a read or write (any / now / at / between)
//! - Value + hash: payload model and its canonical content hash
//! - Validity + Overlap: interval model and overlap classification
//! - ValidityFilter: read-side predicate
//! - Record / StoredVersion / Mutation: what is written and what is stored
//! - Source / Sourcing / SourceRegister: external identifiers
//! - RecordStorage: the persistence boundary
//! - Error: error type hierarchy
//!
//! Nothing in here performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod filter;
pub mod hash;
pub mod interval;
pub mod mutation;
pub mod record;
pub mod referential;
pub mod source;
pub mod timestamp;
pub mod traits;
pub mod uid;
pub mod value;

pub use error::{TemporaError, TemporaResult, TransactionFailureReason};
pub use filter::ValidityFilter;
pub use hash::{canonical_bytes, content_hash, xxh3_hex, ContentHash};
pub use interval::{Overlap, Validity};
pub use mutation::{
    CommitReceipt, Mutation, MutationBatch, MutationCounts, MutationKind, TimelineSnapshot,
};
pub use record::{Record, Referentialized, StoredVersion};
pub use referential::{NowPoint, Referential, ReferentialKind, WriteWindow};
pub use source::{
    Cardinality, ExternalId, Source, SourceIdType, SourceRegister, SourceRegisterBuilder,
    SourceSet, SourceValue, Sourcing,
};
pub use timestamp::Timestamp;
pub use traits::{IndexSpec, RecordStorage};
pub use uid::{RecordId, Uid};
pub use value::Value;
