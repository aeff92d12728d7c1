//! Stamp collision handling against a fault-injecting store

use crate::common::*;
use myelin::derive_stamp;

fn config() -> EntityConfig {
    EntityConfig::named("user").with_salt("test-salt")
}

#[test]
fn collision_reshuffles_to_next_attempt() {
    let c = FaultyCollection::new(config());
    c.store.collide_stamps(3);

    let record = c
        .create(&person("alice"), body(json!({"name": "alice"})))
        .unwrap();
    let expected = derive_stamp(&person("alice"), "user", "test-salt", 3).unwrap();
    assert_eq!(record.stamp(), Some(expected.stamp.as_str()));
    assert_eq!(record.short(), Some(expected.short.as_str()));
}

#[test]
fn persistent_collision_is_bounded() {
    let c = FaultyCollection::new(config().with_max_stamp_attempts(4));
    c.store.collide_stamps(u64::MAX);

    assert_root!(
        c.create(&person("alice"), body(json!({"name": "alice"}))),
        Error::IdentityExhausted { attempts: 4 }
    );
    assert!(c.store.inner().is_empty());
}

#[test]
fn exhaustion_carries_generation_notes() {
    let c = FaultyCollection::new(config().with_max_stamp_attempts(1));
    c.store.collide_stamps(1);

    let err = c
        .create(&person("alice"), body(json!({"name": "alice"})))
        .unwrap_err();
    assert!(err.is_warning());
    assert_eq!(
        err.notes(),
        vec![
            "failed creating document",
            "failed generating ID",
            "cannot create document stamp"
        ]
    );
}

#[test]
fn store_failure_during_check_is_issue() {
    let c = FaultyCollection::new(config());
    c.store.fail_counts(true);

    let err = c
        .create(&person("alice"), body(json!({"name": "alice"})))
        .unwrap_err();
    assert!(err.is_issue());
    assert_eq!(err.notes()[0], "failed creating document");
    assert!(err.notes().contains(&"failed checking document"));
}
