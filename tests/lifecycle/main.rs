//! Lifecycle transitions end to end
//!
//! disable / resume / remove as seen by default-scoped reads, plus the
//! transition table itself.

#[macro_use]
#[path = "../common/mod.rs"]
mod common;

use common::*;
use myelin::{can_transition, Transition};

fn by_ref(record: &Record) -> Query {
    Query::by_reference(record.reference().unwrap())
}

#[test]
fn disable_hides_from_default_reads() {
    let c = TestCollection::new();
    let people = c.people(3);

    c.disable(&by_ref(&people[1])).unwrap();

    assert_eq!(c.total().unwrap(), 2);
    let listed = c.list(&Query::new(), Pagination::default()).unwrap();
    assert!(listed.iter().all(|r| r.reference() != people[1].reference()));
    assert!(c.get(&by_ref(&people[1])).unwrap_err().is_not_found());

    let disabled = c
        .get(&by_ref(&people[1]).with_status(Status::Disabled))
        .unwrap();
    assert_eq!(disabled.status(), Status::Disabled);
}

#[test]
fn resume_reverses_disable_exactly() {
    let c = TestCollection::new();
    let original = c.people(1).remove(0);

    c.disable(&by_ref(&original)).unwrap();
    let resumed = c.resume(&by_ref(&original)).unwrap();

    assert_eq!(resumed.status(), Status::Active);
    assert_eq!(resumed.identity(), original.identity());
    assert_eq!(resumed.str_field("name"), original.str_field("name"));
    assert_eq!(c.total().unwrap(), 1);
}

#[test]
fn disable_twice_fails_the_second_time() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);
    c.disable(&by_ref(&record)).unwrap();

    let err = c.disable(&by_ref(&record)).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "failed disabling document: document check before disable: no document matched the query"
    );
}

#[test]
fn resume_requires_disabled() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);
    assert_root!(c.resume(&by_ref(&record)), Error::NotFound);
}

#[test]
fn remove_is_a_status_write() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);

    let removed = c.remove(&by_ref(&record)).unwrap();
    assert_eq!(removed.status(), Status::Removed);

    assert_eq!(c.total().unwrap(), 0);
    assert_eq!(c.store.len(), 1);
    assert_eq!(c.all().unwrap()[0].status(), Status::Removed);
}

#[test]
fn removed_record_frees_its_hash() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);
    c.remove(&by_ref(&record)).unwrap();

    let again = c
        .create(&person("p0"), body(json!({"name": "p0"})))
        .unwrap();
    assert_eq!(again.hash(), record.hash());
    assert_ne!(again.reference(), record.reference());
}

#[test]
fn remove_disabled_needs_explicit_status() {
    let c = TestCollection::new();
    let record = c
        .touch(&person("t"), body(json!({"name": "t"})))
        .unwrap();

    assert_root!(c.remove(&by_ref(&record)), Error::NotFound);
    let removed = c
        .remove(&by_ref(&record).with_status(Status::Disabled))
        .unwrap();
    assert_eq!(removed.status(), Status::Removed);
}

#[test]
fn transitions_refuse_ambiguous_queries() {
    let c = TestCollection::new();
    c.people(2);
    assert_root!(
        c.disable(&Query::new().eq("model", "user")),
        Error::Ambiguous { count: 2 }
    );
    assert_eq!(c.total().unwrap(), 2);
}

#[test]
fn transition_table() {
    assert!(can_transition(Status::Active, Status::Disabled));
    assert!(can_transition(Status::Disabled, Status::Active));
    assert!(can_transition(Status::Locked, Status::Removed));
    assert!(!can_transition(Status::Removed, Status::Active));
    assert!(!can_transition(Status::Active, Status::Locked));

    for t in Transition::ALL {
        assert_eq!(t.data().len(), 1);
    }
}

#[test]
fn store_failure_during_transition_keeps_state() {
    let c = FaultyCollection::new(EntityConfig::named("user").with_salt("s"));
    let record = c
        .create(&person("f"), body(json!({"name": "f"})))
        .unwrap();
    c.store.fail_bulk_updates(true);

    let err = c.disable(&by_ref(&record)).unwrap_err();
    assert!(err.is_issue());
    c.store.heal();
    assert_eq!(c.get(&by_ref(&record)).unwrap().status(), Status::Active);
}
