//! Orchestrator calls from several threads on one collection

use std::sync::Arc;
use std::thread;

use crate::common::*;

#[test]
fn parallel_creates_of_distinct_factors_all_land() {
    let c = Arc::new(TestCollection::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for i in 0..10 {
                    let name = format!("t{}-{}", t, i);
                    c.create(&person(&name), body(json!({"name": name})))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(c.total().unwrap(), 80);
    let mut stamps: Vec<_> = c
        .store
        .snapshot()
        .into_iter()
        .filter_map(|r| r.stamp().map(str::to_string))
        .collect();
    stamps.sort();
    stamps.dedup();
    assert_eq!(stamps.len(), 80);
}

#[test]
fn racing_edits_never_lose_the_record() {
    let c = Arc::new(TestCollection::new());
    let record = c.people(1).remove(0);
    let reference = record.reference().unwrap().to_string();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let c = Arc::clone(&c);
            let reference = reference.clone();
            thread::spawn(move || {
                let mut landed = 0;
                for i in 0..20 {
                    let result = c.edit(
                        &Query::by_reference(reference.as_str()),
                        body(json!({"writer": t, "round": i})),
                    );
                    match result {
                        Ok(_) => landed += 1,
                        Err(e) => assert!(matches!(e.root(), Error::Conflict(_)), "{}", e),
                    }
                }
                landed
            })
        })
        .collect();
    let landed: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert!(landed > 0);
    let stored = c.get(&Query::by_reference(reference.as_str())).unwrap();
    assert_eq!(stored.identity(), record.identity());
    assert!(stored.version > record.version);
}
