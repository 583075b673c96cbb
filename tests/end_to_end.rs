//! End-to-end tests through the public facade

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;
use tempora::{
    ExternalId, MemoryStore, Query, Record, RecordStore, Referential, Referentialized,
    SourceIdType, SourceRegister, SourceSet, Sourcing, StoreConfig, Timestamp, Uid,
    CONFIG_FILE_NAME,
};

fn ts(input: &str) -> Result<Timestamp> {
    Ok(Timestamp::parse_rfc3339(input)?)
}

fn name(store: &RecordStore, uid: &Uid, referential: &Referential) -> Result<Option<String>> {
    Ok(store.find_at(uid, referential)?.and_then(|v| {
        v.payload
            .get("name")
            .and_then(|n| n.as_str())
            .map(str::to_string)
    }))
}

#[test]
fn test_patient_rename_scenario() -> Result<()> {
    let store = RecordStore::in_memory();
    let p1 = Uid::new("p1");

    store.put(
        Record::new(json!({"name": "Arnold"})).with_uid(p1.clone()),
        &Referential::at(ts("2001-01-01T00:00:00Z")?),
    )?;
    store.put(
        Record::new(json!({"name": "Bernard"})).with_uid(p1.clone()),
        &Referential::at(ts("2020-01-01T00:00:00Z")?),
    )?;

    assert_eq!(name(&store, &p1, &Referential::now())?.as_deref(), Some("Bernard"));
    assert_eq!(
        name(&store, &p1, &Referential::at(ts("2010-01-01T00:00:00Z")?))?.as_deref(),
        Some("Arnold")
    );
    assert_eq!(name(&store, &p1, &Referential::at(ts("1999-01-01T00:00:00Z")?))?, None);
    assert_eq!(store.count(&Query::uid("p1"), &Referential::any())?, 2);
    Ok(())
}

#[test]
fn test_store_from_config_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join(CONFIG_FILE_NAME);
    StoreConfig {
        default_referential: "any".to_string(),
        ..StoreConfig::default()
    }
    .write_to_file(&path)?;

    let config = StoreConfig::from_file(&path)?;
    let store = RecordStore::new(Arc::new(MemoryStore::new()), config)?;

    let uid = Uid::new("p1");
    store.put(
        Record::new(json!({"name": "a"})).with_uid(uid.clone()),
        &Referential::between(Timestamp::from_secs(0), Timestamp::from_secs(10))?,
    )?;

    // Closed in the past: invisible now, visible under the configured "any"
    assert!(store.find_at(&uid, &Referential::now())?.is_none());
    assert!(store.find(&uid)?.is_some());
    assert_eq!(store.count_default(&Query::All)?, 1);
    assert_eq!(store.list_default(&[uid])?.len(), 1);
    Ok(())
}

#[test]
fn test_mixed_referential_batch() -> Result<()> {
    let store = RecordStore::in_memory();
    let t = Timestamp::from_secs;

    let receipt = store.put_referentialized(vec![
        Referentialized::new(
            Record::new(json!({"name": "past"})).with_uid("p1"),
            Referential::between(t(0), t(100))?,
        ),
        Referentialized::new(
            Record::new(json!({"name": "later"})).with_uid("p1"),
            Referential::at(t(100)),
        ),
        Referentialized::new(Record::new(json!({"name": "other"})).with_uid("p2"), Referential::now()),
    ])?;

    assert_eq!(receipt.uids.len(), 3);
    assert_eq!(receipt.applied.inserted, 3);
    assert_eq!(store.metrics().total_committed, 1);

    let history = store.history(&Uid::new("p1"))?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].validity_end(), Some(history[1].validity_start()));
    assert!(history[1].is_open());
    Ok(())
}

#[test]
fn test_cross_reference_through_facade() -> Result<()> {
    let register = SourceRegister::builder()
        .register(SourceSet::new("patient").with_source("ehr", SourceIdType::Int))?
        .build();
    let ehr = register
        .for_name("patient", "ehr")
        .ok_or_else(|| anyhow::anyhow!("ehr source not registered"))?;

    let store = RecordStore::in_memory();
    let mut sourcing = Sourcing::new();
    sourcing.set_source_id(ehr, 1001i64)?;
    store.put(
        Record::new(json!({"name": "Arnold"}))
            .with_uid("p1")
            .with_sources(sourcing),
        &Referential::at(Timestamp::EPOCH),
    )?;

    let mapped = store.map_uid_by_source_ids(
        ehr,
        &[ExternalId::Int(1001), ExternalId::Int(1002)],
        &Referential::now(),
    )?;
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped.get(&ExternalId::Int(1001)), Some(&Uid::new("p1")));
    Ok(())
}

#[test]
fn test_any_referential_cannot_write() {
    let store = RecordStore::in_memory();
    let err = store
        .put(Record::new(json!({"name": "x"})), &Referential::any())
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(store.metrics().total_submitted, 0);
}
