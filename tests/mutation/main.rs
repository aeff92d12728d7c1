//! Mutation pipelines: create, touch, edit, update, modify
//!
//! These check the observable contract of each pipeline: which step
//! stops it, the notes on the error, and what is left in the store.

#[macro_use]
#[path = "../common/mod.rs"]
mod common;

mod concurrency;

use common::*;
use myelin::{EditOptions, Transition};

// ============================================================================
// create / touch
// ============================================================================

#[test]
fn create_yields_active_record_with_identity() {
    let c = TestCollection::new();
    let record = c
        .create(&person("alice"), body(json!({"name": "alice", "age": 30})))
        .unwrap();

    assert_eq!(record.status(), Status::Active);
    assert!(record.identity().is_some());
    assert_eq!(record.str_field(fields::MODEL), Some("user"));
    assert_eq!(record.get("age"), Some(&json!(30)));
}

#[test]
fn create_refresh_runs_store_hooks() {
    let c = TestCollection::new();
    c.store.add_hook(|fields| {
        if let Some(name) = fields.get("name").and_then(Value::as_str) {
            let upper = name.to_uppercase();
            fields.insert("display".into(), json!(upper));
        }
    });

    let record = c
        .create(&person("bob"), body(json!({"name": "bob"})))
        .unwrap();
    assert_eq!(record.str_field("display"), Some("BOB"));
}

#[test]
fn touch_yields_disabled_record() {
    let c = TestCollection::new();
    let record = c
        .touch(&person("tess"), body(json!({"name": "tess"})))
        .unwrap();
    assert_eq!(record.status(), Status::Disabled);
    assert!(record.identity().is_some());
    assert_eq!(c.total().unwrap(), 0);
}

#[test]
fn failed_refresh_leaves_record_removed() {
    let c = FaultyCollection::new(EntityConfig::named("user").with_salt("s"));
    c.store.fail_next_saves(1);

    let err = c
        .touch(&person("x"), body(json!({"name": "x"})))
        .unwrap_err();
    assert_eq!(err.notes()[0], "failed touching document");
    assert!(err.is_issue());

    let stored = c.store.inner().snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status(), Status::Removed);
}

// ============================================================================
// edit
// ============================================================================

#[test]
fn edit_chain_on_missing_record() {
    let c = TestCollection::new();
    let err = c
        .edit(&Query::new().eq("name", "ghost"), body(json!({"age": 1})))
        .unwrap_err();

    assert_eq!(
        err.notes(),
        vec!["failed editing document", "document test before edit"]
    );
    assert!(err.is_not_found());
    assert!(err.is_warning());
}

#[test]
fn edit_keeps_identity_and_bumps_version() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);

    let edited = c
        .edit(
            &Query::by_reference(record.reference().unwrap()),
            body(json!({"age": 41, "reference": "forged"})),
        )
        .unwrap();

    assert_eq!(edited.identity(), record.identity());
    assert_eq!(edited.get("age"), Some(&json!(41)));
    assert!(edited.version > record.version);
}

#[test]
fn stale_save_conflicts() {
    let c = FaultyCollection::new(EntityConfig::named("user").with_salt("s"));
    let record = c
        .create(&person("v"), body(json!({"name": "v"})))
        .unwrap();

    // a write sneaking in between read and save is caught by the version
    let mut stale = record.clone();
    stale.set("age", json!(1));
    c.store.inner().save(&record).unwrap();
    assert_root!(c.store.save(&stale), Error::Conflict(_));
}

#[test]
fn edit_reconciles_arrays_on_request() {
    let c = TestCollection::new();
    let record = c
        .create(
            &person("cart"),
            body(json!({"name": "cart", "tags": ["a"], "lines": [{"name": "x", "qty": 1}]})),
        )
        .unwrap();
    let query = Query::by_reference(record.reference().unwrap());

    let untouched = c
        .edit(&query, body(json!({"tags": ["b"]})))
        .unwrap();
    assert_eq!(untouched.get("tags"), Some(&json!(["a"])));

    let reconciled = c
        .edit_with(
            &query,
            body(json!({
                "tags": ["a", "b"],
                "lines": [{"name": "x", "qty": 3}, {"name": "y", "qty": 1}]
            })),
            EditOptions {
                reconcile_arrays: true,
            },
        )
        .unwrap();
    assert_eq!(reconciled.get("tags"), Some(&json!(["a", "b"])));
    assert_eq!(
        reconciled.get("lines"),
        Some(&json!([{"name": "x", "qty": 3}, {"name": "y", "qty": 1}]))
    );
}

#[test]
fn edit_reconciles_arrays_on_record_without_reference() {
    let c = TestCollection::new();
    let record = c
        .add(body(json!({"name": "bare", "tags": ["a"]})))
        .unwrap();
    assert!(record.reference().is_none());

    let reconciled = c
        .edit_with(
            &Query::new().eq("name", "bare"),
            body(json!({"name": "renamed", "tags": ["b"]})),
            EditOptions {
                reconcile_arrays: true,
            },
        )
        .unwrap();
    assert_eq!(reconciled.id, record.id);
    assert_eq!(reconciled.str_field("name"), Some("renamed"));
    assert_eq!(reconciled.get("tags"), Some(&json!(["b"])));
}

// ============================================================================
// update / modify
// ============================================================================

#[test]
fn update_one_record_refreshes_it() {
    let c = TestCollection::new();
    let people = c.people(3);

    let report = c
        .update(
            &Query::by_reference(people[2].reference().unwrap()),
            body(json!({"age": 9, "status": "disabled"})),
        )
        .unwrap();

    assert_eq!(report.matched, 1);
    assert_eq!(report.records[0].status(), Status::Disabled);
    assert_eq!(c.total().unwrap(), 2);
}

#[test]
fn update_many_records_reboots_them() {
    let c = TestCollection::new();
    c.people(6);

    let report = c
        .update(&Query::new().eq("model", "user"), body(json!({"team": "red"})))
        .unwrap();

    assert_eq!(report.matched, 6);
    assert_eq!(report.modified, 6);
    assert_eq!(report.records.len(), 6);
    assert!(report.records.iter().all(|r| r.str_field("team") == Some("red")));
}

#[test]
fn update_covers_exactly_the_matched_records() {
    let c = TestCollection::new();
    for name in ["a1", "a2", "a3"] {
        c.add(body(json!({"kind": "a", "name": name}))).unwrap();
    }
    let parked = c.disable(&Query::new().eq("name", "a3")).unwrap();

    let report = c
        .update(
            &Query::new().eq("kind", "a"),
            body(json!({"status": "disabled"})),
        )
        .unwrap();

    assert_eq!(report.matched, 2);
    assert_eq!(report.records.len() as u64, report.matched);
    assert!(report.records.iter().all(|r| r.id != parked.id));
    assert_eq!(c.store.get(parked.id).unwrap().version, parked.version);
}

#[test]
fn update_never_touches_managed_or_array_fields() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);

    let report = c
        .update(
            &Query::by_reference(record.reference().unwrap()),
            body(json!({"stamp": "x", "tags": ["y"], "age": 2})),
        )
        .unwrap();
    let updated = &report.records[0];
    assert_eq!(updated.stamp(), record.stamp());
    assert!(updated.get("tags").is_none());
}

#[test]
fn update_with_nothing_to_set_is_empty_data() {
    let c = TestCollection::new();
    c.people(1);
    assert_root!(
        c.update(&Query::new().eq("name", "p0"), body(json!({"hash": "x"}))),
        Error::EmptyData
    );
}

#[test]
fn modify_can_remove_with_raw_set() {
    let c = TestCollection::new();
    c.people(2);

    let report = c
        .modify(
            &Query::new().eq("model", "user"),
            vec![Patch::Set(Transition::Remove.data())],
        )
        .unwrap();

    assert_eq!(report.matched, 2);
    assert!(report.records.iter().all(|r| r.status() == Status::Removed));
    assert_eq!(c.total().unwrap(), 0);
}

#[test]
fn modify_pushes_into_arrays() {
    let c = TestCollection::new();
    let record = c.people(1).remove(0);

    let report = c
        .modify(
            &Query::by_reference(record.reference().unwrap()),
            vec![Patch::Push {
                field: "history".into(),
                value: json!({"event": "login"}),
            }],
        )
        .unwrap();
    assert_eq!(
        report.records[0].get("history"),
        Some(&json!([{"event": "login"}]))
    );
}
