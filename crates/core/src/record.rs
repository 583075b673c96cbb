//! Records and stored versions
//!
//! A [`Record`] is what callers write: a payload, optional identity,
//! optional source ids and optional official validity bounds. The store
//! keeps [`StoredVersion`]s, one per historical state of an identity.

use serde::{Deserialize, Serialize};

use crate::error::TemporaResult;
use crate::hash::{content_hash, ContentHash};
use crate::interval::Validity;
use crate::referential::Referential;
use crate::source::Sourcing;
use crate::timestamp::Timestamp;
use crate::uid::{RecordId, Uid};
use crate::value::Value;

/// Item supplied to an insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identity; a random one is generated on insertion when absent
    pub uid: Option<Uid>,
    /// Entity payload, opaque to the temporal algorithm
    pub payload: Value,
    /// External source ids
    #[serde(default)]
    pub sources: Sourcing,
    /// Business-meaning start, carried through unchanged
    #[serde(default)]
    pub official_validity_start: Option<Timestamp>,
    /// Business-meaning end, carried through unchanged
    #[serde(default)]
    pub official_validity_end: Option<Timestamp>,
}

impl Record {
    /// Record without identity, sources or official bounds
    pub fn new(payload: impl Into<Value>) -> Self {
        Record {
            uid: None,
            payload: payload.into(),
            sources: Sourcing::new(),
            official_validity_start: None,
            official_validity_end: None,
        }
    }

    /// Set the identity
    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Attach source ids
    pub fn with_sources(mut self, sources: Sourcing) -> Self {
        self.sources = sources;
        self
    }

    /// Set the official validity bounds
    pub fn with_official_validity(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        self.official_validity_start = start;
        self.official_validity_end = end;
        self
    }

    /// The structure fed to the content hash
    ///
    /// The payload alone, or `{payload, sources}` when sources are attached.
    /// Identity and official bounds never take part.
    pub fn hashed_content(&self) -> Value {
        if self.sources.is_empty() {
            self.payload.clone()
        } else {
            Value::object([
                ("payload", self.payload.clone()),
                ("sources", self.sources.to_value()),
            ])
        }
    }

    /// Canonical content hash
    pub fn content_hash(&self) -> TemporaResult<ContentHash> {
        content_hash(&self.hashed_content())
    }
}

/// A record paired with the referential it should be written with
#[derive(Debug, Clone)]
pub struct Referentialized {
    /// Item to write
    pub record: Record,
    /// When it is valid
    pub referential: Referential,
}

impl Referentialized {
    /// Pair a record with a referential
    pub fn new(record: Record, referential: Referential) -> Self {
        Referentialized {
            record,
            referential,
        }
    }
}

/// One historical state of an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVersion {
    /// Row identifier, stable across bound adjustments
    pub id: RecordId,
    /// Identity
    pub uid: Uid,
    /// Content fingerprint
    pub hash: ContentHash,
    /// Validity interval
    pub validity: Validity,
    /// Business-meaning start
    pub official_validity_start: Option<Timestamp>,
    /// Business-meaning end
    pub official_validity_end: Option<Timestamp>,
    /// Entity payload
    pub payload: Value,
    /// External source ids
    pub sources: Sourcing,
}

impl StoredVersion {
    /// Build a fresh version from a record
    pub fn from_record(uid: Uid, hash: ContentHash, validity: Validity, record: &Record) -> Self {
        StoredVersion {
            id: RecordId::new(),
            uid,
            hash,
            validity,
            official_validity_start: record.official_validity_start,
            official_validity_end: record.official_validity_end,
            payload: record.payload.clone(),
            sources: record.sources.clone(),
        }
    }

    /// Inclusive start
    pub fn validity_start(&self) -> Timestamp {
        self.validity.start
    }

    /// Exclusive end; `None` when open
    pub fn validity_end(&self) -> Option<Timestamp> {
        self.validity.end
    }

    /// Still in effect
    pub fn is_open(&self) -> bool {
        self.validity.is_open()
    }
}
