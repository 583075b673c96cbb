//! Identity and row identifiers
//!
//! - [`Uid`]: names one logical entity across its whole history
//! - [`RecordId`]: names one stored version; stable while its bounds move

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::hash::xxh3_hex;

/// Identity of a logical entity
///
/// Opaque string. Either random ([`Uid::generate`]) or derived from
/// external keys ([`Uid::from_components`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an existing identity string
    pub fn new(uid: impl Into<String>) -> Self {
        Uid(uid.into())
    }

    /// Random identity (UUID v4)
    pub fn generate() -> Self {
        Uid(Uuid::new_v4().to_string())
    }

    /// Deterministic identity from a sequence of components
    ///
    /// Each component is hashed on its own and the digests are joined with
    /// `-`, so the same keys always produce the same identity.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = components
            .into_iter()
            .map(|c| xxh3_hex(c.as_ref().as_bytes()))
            .collect();
        Uid(parts.join("-"))
    }

    /// The identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Uid(s.to_string())
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Uid(s)
    }
}

/// Identifier of one stored version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Allocate a fresh identifier
    pub fn new() -> Self {
        RecordId(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
