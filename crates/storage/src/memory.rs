//! MemoryStore: in-memory DocumentStore with BTreeMap and version management
//!
//! This module implements the DocumentStore trait using:
//! - `BTreeMap<u64, Record>` keyed by insertion sequence, so store order is
//!   insertion order
//! - A `RecordId -> sequence` index for saves
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for the insertion sequence
//!
//! # Design Notes
//!
//! - **Per-record versions**: every write bumps the record's own version;
//!   `save` refuses a record whose version is not the stored one
//! - **Conditional writes**: `bulk_update` re-evaluates its query under the
//!   write lock, so the query doubles as a compare-and-swap precondition
//! - **Hooks**: save hooks run on every insert, save and modifying bulk
//!   update, standing in for store-side middleware that computes derived
//!   fields
//! - **No durability**: everything lives in process memory

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::trace;

use myelin_core::{
    DocumentStore, Error, Patch, Query, Record, RecordId, Result, Sort, UpdateOutcome,
    UpdateSettings,
};

/// Field the store writes the creation time into, when timestamps are on
pub const CREATED_FIELD: &str = "created";
/// Field the store writes the last write time into, when timestamps are on
pub const UPDATED_FIELD: &str = "updated";

/// Derived-field computation run on every write
pub type SaveHook = Arc<dyn Fn(&mut Map<String, Value>) + Send + Sync>;

#[derive(Default)]
struct Records {
    by_sequence: BTreeMap<u64, Record>,
    index: HashMap<RecordId, u64>,
}

impl Records {
    fn matching<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a Record> + 'a {
        self.by_sequence.values().filter(move |r| query.matches(r))
    }
}

/// In-memory document store
///
/// Thread-safe through `parking_lot::RwLock`. Cloning the handle is not
/// supported; share it behind an `Arc`.
pub struct MemoryStore {
    records: RwLock<Records>,
    sequence: AtomicU64,
    hooks: RwLock<Vec<SaveHook>>,
    timestamps: bool,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records::default()),
            sequence: AtomicU64::new(0),
            hooks: RwLock::new(Vec::new()),
            timestamps: false,
        }
    }

    /// Store that maintains `created` / `updated` RFC 3339 timestamps
    pub fn with_timestamps() -> Self {
        Self {
            timestamps: true,
            ..Self::new()
        }
    }

    /// Register a hook run on every write
    ///
    /// Hooks run in registration order, after the write is applied and
    /// before the record is stored.
    pub fn add_hook<F>(&self, hook: F)
    where
        F: Fn(&mut Map<String, Value>) + Send + Sync + 'static,
    {
        self.hooks.write().push(Arc::new(hook));
    }

    /// Number of stored records regardless of status
    pub fn len(&self) -> usize {
        self.records.read().by_sequence.len()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored record in insertion order
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.read().by_sequence.values().cloned().collect()
    }

    /// Stored record by id, regardless of status
    pub fn get(&self, id: RecordId) -> Option<Record> {
        let records = self.records.read();
        let sequence = records.index.get(&id)?;
        records.by_sequence.get(sequence).cloned()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn run_hooks(&self, fields: &mut Map<String, Value>, created: bool) {
        if self.timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            if created {
                fields.insert(CREATED_FIELD.to_string(), now.clone());
            }
            fields.insert(UPDATED_FIELD.to_string(), now);
        }
        for hook in self.hooks.read().iter() {
            hook(fields);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.len())
            .field("hooks", &self.hooks.read().len())
            .field("timestamps", &self.timestamps)
            .finish()
    }
}

impl DocumentStore for MemoryStore {
    fn count(&self, query: &Query) -> Result<u64> {
        let records = self.records.read();
        let count = records.matching(query).count() as u64;
        Ok(count)
    }

    fn find_one(&self, query: &Query) -> Result<Option<Record>> {
        let records = self.records.read();
        let found = records.matching(query).next().cloned();
        Ok(found)
    }

    fn find(
        &self,
        query: &Query,
        skip: u64,
        limit: Option<u64>,
        sort: Option<&Sort>,
    ) -> Result<Vec<Record>> {
        let records = self.records.read();
        let mut found: Vec<Record> = records.matching(query).cloned().collect();
        drop(records);

        if let Some(sort) = sort.filter(|s| !s.is_empty()) {
            found.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    fn save(&self, record: &Record) -> Result<Record> {
        let mut records = self.records.write();
        let sequence = *records.index.get(&record.id).ok_or(Error::NotFound)?;
        let stored = records
            .by_sequence
            .get_mut(&sequence)
            .ok_or_else(|| Error::Unexpected(format!("index points at missing record {}", record.id)))?;

        if stored.version != record.version {
            return Err(Error::conflict(format!(
                "record {} is at version {}, save carried version {}",
                record.id, stored.version, record.version
            )));
        }

        let mut fields = record.fields.clone();
        self.run_hooks(&mut fields, false);
        stored.fields = fields;
        stored.version += 1;
        trace!(id = %record.id, version = stored.version, "saved record");
        Ok(stored.clone())
    }

    fn insert(&self, mut fields: Map<String, Value>) -> Result<Record> {
        self.run_hooks(&mut fields, true);
        let record = Record::new(RecordId::new(), fields);
        let sequence = self.next_sequence();

        let mut records = self.records.write();
        records.index.insert(record.id, sequence);
        records.by_sequence.insert(sequence, record.clone());
        trace!(id = %record.id, "inserted record");
        Ok(record)
    }

    fn bulk_update(
        &self,
        query: &Query,
        patch: &[Patch],
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome> {
        let mut records = self.records.write();
        let mut outcome = UpdateOutcome::default();

        for record in records.by_sequence.values_mut() {
            if !query.matches(record) {
                continue;
            }
            outcome.matched += 1;

            let mut fields = record.fields.clone();
            let mut changed = false;
            for op in patch {
                changed |= op.apply(&mut fields);
            }
            if changed {
                self.run_hooks(&mut fields, false);
                record.fields = fields;
                record.version += 1;
                outcome.modified += 1;
            }

            if !settings.multi {
                break;
            }
        }

        trace!(
            matched = outcome.matched,
            modified = outcome.modified,
            "bulk update applied"
        );
        Ok(outcome)
    }
}
