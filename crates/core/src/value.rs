//! Payload value model
//!
//! Record payloads are opaque to the temporal algorithm; they only need a
//! structure the canonicalizer can walk. The model has exactly 9 variants:
//! Null, Bool, Int, UInt, Float, String, Bytes, Array, Object.
//!
//! ### Type Rules
//!
//! - No implicit type coercions: `Int(1) != Float(1.0)`
//! - `UInt` only holds integers above `i64::MAX`; smaller unsigned values
//!   are `Int`, so each integer has exactly one representation
//! - `Bytes` are not `String`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Object key order is irrelevant to equality and to the content hash

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::timestamp::Timestamp;

/// Structured record payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Unsigned integer above `i64::MAX`
    UInt(u64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordered sequence; order is significant for the content hash
    Array(Vec<Value>),
    /// Object with string keys
    Object(HashMap<String, Value>),
}

// Custom PartialEq implementation for IEEE-754 float semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

impl Value {
    /// Build an object from `(key, value)` pairs
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as u64 if this is a non-negative integer
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as map if this is an Object value
    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a top-level field of an object
    ///
    /// Returns `None` for non-objects and missing fields.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(field))
    }

    /// Set a top-level field, turning a non-object into an empty object first
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        if !self.is_object() {
            *self = Value::Object(HashMap::new());
        }
        if let Value::Object(o) = self {
            o.insert(field.into(), value.into());
        }
    }
}

// From implementations for ergonomic API usage

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::UInt(u),
        }
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(o: HashMap<String, Value>) -> Self {
        Value::Object(o)
    }
}

impl From<Timestamp> for Value {
    /// Instants are stored as raw microseconds
    fn from(ts: Timestamp) -> Self {
        Value::Int(ts.as_micros())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// serde_json interop for ergonomic JSON construction
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_no_coercion() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bytes(b"a".to_vec()), Value::String("a".into()));
    }

    #[test]
    fn test_value_float_semantics() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn test_value_object_equality_ignores_order() {
        let a = Value::object([("x", 1i64), ("y", 2i64)]);
        let b = Value::object([("y", 2i64), ("x", 1i64)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_get_and_set() {
        let mut v = Value::from(json!({"name": "Meuh", "age": 17}));
        assert_eq!(v.get("name").and_then(Value::as_str), Some("Meuh"));
        assert_eq!(v.get("age").and_then(Value::as_int), Some(17));
        assert!(v.get("missing").is_none());

        v.set("name", "Meh");
        assert_eq!(v.get("name").and_then(Value::as_str), Some("Meh"));

        let mut scalar = Value::Int(3);
        scalar.set("k", true);
        assert_eq!(scalar.get("k"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_value_from_json_nested() {
        let v = Value::from(json!({"items": [1, 2.5, null, "s"], "flag": false}));
        let items = v.get("items").and_then(Value::as_array).unwrap();
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1], Value::Float(2.5));
        assert!(items[2].is_null());
        assert_eq!(v.get("flag").and_then(Value::as_bool), Some(false));
    }

    #[test]
    fn test_value_large_unsigned_is_exact() {
        let max = Value::from(json!({"n": u64::MAX}));
        let below = Value::from(json!({"n": u64::MAX - 1}));
        assert_eq!(max.get("n"), Some(&Value::UInt(u64::MAX)));
        assert_eq!(below.get("n").and_then(Value::as_uint), Some(u64::MAX - 1));
        assert_ne!(max, below);

        // One representation per integer
        assert_eq!(Value::from(7u64), Value::Int(7));
        assert_eq!(Value::from(json!(7u64)), Value::Int(7));
        assert_eq!(Value::Int(7).as_uint(), Some(7));
        assert_eq!(Value::Int(-1).as_uint(), None);
    }

    #[test]
    fn test_value_from_option_and_timestamp() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Timestamp::from_secs(2)), Value::Int(2_000_000));
    }
}
