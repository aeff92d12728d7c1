//! Shared unit-test fixtures

use serde_json::{json, Map, Value};

use myelin_core::EntityConfig;
use myelin_storage::MemoryStore;

use crate::collection::Collection;

pub(crate) fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

pub(crate) fn config() -> EntityConfig {
    EntityConfig::named("user").with_salt("pepper")
}

pub(crate) fn collection() -> Collection<MemoryStore> {
    Collection::new(MemoryStore::new(), config()).unwrap()
}

/// Collection holding `n` active records named `n0..` with `rank` = index
pub(crate) fn seeded(n: u64) -> Collection<MemoryStore> {
    let c = collection();
    for i in 0..n {
        c.add(body(json!({"name": format!("n{}", i), "rank": i})))
            .unwrap();
    }
    c
}
