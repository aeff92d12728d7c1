//! Multi-record resets after bulk writes
//!
//! A write matching several records re-saves each of them in parallel
//! waves. Slack collections skip individual failures; strict ones fail
//! the reset as a batch.

#[macro_use]
#[path = "../common/mod.rs"]
mod common;

use common::*;
use myelin::SaveFailure;

fn team(slack: bool, n: usize) -> (FaultyCollection, Vec<Record>) {
    let c = FaultyCollection::new(
        EntityConfig::named("user")
            .with_salt("s")
            .with_reboot_parallelism(3)
            .with_slack(slack),
    );
    let people = (0..n)
        .map(|i| {
            let name = format!("p{}", i);
            c.create(&person(&name), body(json!({"name": name, "team": "blue"})))
                .unwrap()
        })
        .collect();
    (c, people)
}

fn stamp_hook(c: &FaultyCollection) {
    c.store.inner().add_hook(|fields| {
        let saves = fields.get("saves").and_then(Value::as_u64).unwrap_or(0);
        fields.insert("saves".into(), json!(saves + 1));
    });
}

#[test]
fn every_matched_record_is_resaved() {
    let (c, _) = team(true, 10);
    stamp_hook(&c);
    let before = c.store.calls().save;

    let report = c
        .update(&Query::new().eq("team", "blue"), body(json!({"team": "red"})))
        .unwrap();

    assert_eq!(report.matched, 10);
    assert!(report.failures.is_empty());
    assert_eq!(c.store.calls().save - before, 10);
    // one hook run for the bulk write, one for the reboot save
    assert!(report
        .records
        .iter()
        .all(|r| r.get("saves") == Some(&json!(2)) && r.str_field("team") == Some("red")));
}

#[test]
fn slack_reset_skips_failed_saves() {
    let (c, people) = team(true, 7);
    c.store.fail_saves_for(people[4].reference().unwrap());

    let report = c
        .update(&Query::new().eq("team", "blue"), body(json!({"team": "red"})))
        .unwrap();

    assert_eq!(report.records.len(), 7);
    assert_eq!(report.failures.len(), 1);
    let SaveFailure { id, error } = &report.failures[0];
    assert_eq!(*id, people[4].id);
    assert!(error.contains("injected save failure"));
}

#[test]
fn strict_reset_fails_as_batch() {
    let (c, people) = team(false, 7);
    c.store.fail_saves_for(people[0].reference().unwrap());
    c.store.fail_saves_for(people[6].reference().unwrap());

    let err = c
        .update(&Query::new().eq("team", "blue"), body(json!({"team": "red"})))
        .unwrap_err();

    assert!(matches!(err.root(), Error::Batch { failed: 2, total: 7 }));
    assert!(err.is_issue());
    assert_eq!(err.notes()[0], "failed updating document");
    assert!(err.notes().contains(&"failed saving reboot document"));

    // the bulk write itself landed before the reset failed
    let reds = c.query_records(&Query::new().eq("team", "red")).unwrap();
    assert_eq!(reds.len(), 7);
}

#[test]
fn strict_reset_still_saves_the_healthy_records() {
    let (c, people) = team(false, 6);
    stamp_hook(&c);
    c.store.fail_saves_for(people[2].reference().unwrap());

    c.update(&Query::new().eq("team", "blue"), body(json!({"team": "red"})))
        .unwrap_err();

    let saved = c
        .query_records(&Query::new().eq("saves", 2))
        .unwrap()
        .len();
    assert_eq!(saved, 5);
}

#[test]
fn reboot_follows_status_change() {
    let (c, _) = team(true, 4);

    let report = c
        .update(
            &Query::new().eq("team", "blue"),
            body(json!({"status": "disabled"})),
        )
        .unwrap();

    assert_eq!(report.records.len(), 4);
    assert!(report.records.iter().all(|r| r.status() == Status::Disabled));
    assert_eq!(c.total().unwrap(), 0);
}

#[test]
fn direct_reboot_over_an_empty_match_is_clean() {
    let (c, _) = team(true, 2);
    let report = c.reboot(&Query::new().eq("team", "green"), false).unwrap();
    assert!(report.is_clean());
    assert!(report.records.is_empty());
}
