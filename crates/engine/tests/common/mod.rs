//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use serde_json::json;
use tempora_core::{Record, StoredVersion, Timestamp, Uid};

const DAY_SECS: i64 = 86_400;

/// Install a test-writer subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Instants relative to a base fixed at construction, truncated to seconds
pub struct Clock {
    base: Timestamp,
}

impl Clock {
    pub fn new() -> Self {
        Clock {
            base: Timestamp::from_secs(Timestamp::now().as_secs()),
        }
    }

    pub fn days_ago(&self, days: i64) -> Timestamp {
        Timestamp::from_secs(self.base.as_secs() - days * DAY_SECS)
    }

    pub fn minutes_ago(&self, minutes: i64) -> Timestamp {
        Timestamp::from_secs(self.base.as_secs() - minutes * 60)
    }
}

/// The reference person payload
pub fn meuh() -> serde_json::Value {
    json!({ "name": "Meuh", "age": 17, "trueness": true })
}

/// Reference person with one field replaced
pub fn meuh_with(field: &str, value: serde_json::Value) -> serde_json::Value {
    let mut payload = meuh();
    payload[field] = value;
    payload
}

pub fn record(uid: &Uid, payload: serde_json::Value) -> Record {
    Record::new(payload).with_uid(uid.clone())
}

pub fn name_of(version: &StoredVersion) -> &str {
    version
        .payload
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

pub fn age_of(version: &StoredVersion) -> Option<i64> {
    version.payload.get("age").and_then(|v| v.as_int())
}
