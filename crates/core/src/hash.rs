//! Canonical encoding and content hashing
//!
//! Two payloads that are structurally equal must hash identically no matter
//! how their objects were built. The canonical form:
//!
//! - sorts every object's keys (byte order), recursively
//! - keeps array order untouched
//! - maps `-0.0` to `0.0` so the hash agrees with `Value` equality
//!
//! The canonical structure is encoded as MessagePack (`rmp-serde`) and
//! hashed with xxh3-64, rendered as 16 lowercase hex digits. The hash is a
//! deduplication fingerprint, not a security primitive.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::TemporaResult;
use crate::value::Value;

/// Hex-encoded xxh3-64 digest of a byte slice
pub fn xxh3_hex(data: &[u8]) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(data))
}

/// Fingerprint of a record's canonical content
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already computed hex digest
    pub fn from_hex(hex: impl Into<String>) -> Self {
        ContentHash(hex.into())
    }

    /// Hash raw bytes
    pub fn of_bytes(bytes: &[u8]) -> Self {
        ContentHash(xxh3_hex(bytes))
    }

    /// The hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes a `Value` in canonical form
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => {
                let f = if *f == 0.0 { 0.0 } else { *f };
                serializer.serialize_f64(f)
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Canonical(item))?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut keys: Vec<&String> = fields.keys().collect();
                keys.sort_unstable();
                let mut map = serializer.serialize_map(Some(keys.len()))?;
                for key in keys {
                    map.serialize_entry(key, &Canonical(&fields[key]))?;
                }
                map.end()
            }
        }
    }
}

/// Encode a value into its canonical byte form
pub fn canonical_bytes(value: &Value) -> TemporaResult<Vec<u8>> {
    Ok(rmp_serde::to_vec(&Canonical(value))?)
}

/// Canonicalize, encode and hash a value
pub fn content_hash(value: &Value) -> TemporaResult<ContentHash> {
    let bytes = canonical_bytes(value)?;
    Ok(ContentHash::of_bytes(&bytes))
}
