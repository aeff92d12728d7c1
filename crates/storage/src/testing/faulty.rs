//! Fault-injecting DocumentStore wrapper
//!
//! Wraps any store and fails selected calls with `Error::Storage`, so the
//! orchestrator's failure paths (slack reboots, compensation, stamp
//! retries) can be driven deterministically.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use myelin_core::{
    fields, DocumentStore, Error, Patch, Query, Record, Result, Sort, UpdateOutcome,
    UpdateSettings,
};

/// Number of calls made to each collaborator method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `count` calls
    pub count: u64,
    /// `find_one` calls
    pub find_one: u64,
    /// `find` calls
    pub find: u64,
    /// `save` calls
    pub save: u64,
    /// `insert` calls
    pub insert: u64,
    /// `bulk_update` calls
    pub bulk_update: u64,
}

#[derive(Default)]
struct Counters {
    count: AtomicU64,
    find_one: AtomicU64,
    find: AtomicU64,
    save: AtomicU64,
    insert: AtomicU64,
    bulk_update: AtomicU64,
}

/// Store wrapper with programmable failures
pub struct FaultyStore<S> {
    inner: S,
    failing_references: Mutex<HashSet<String>>,
    failing_saves: AtomicU64,
    fail_inserts: AtomicBool,
    fail_counts: AtomicBool,
    fail_bulk_updates: AtomicBool,
    stamp_collisions: AtomicU64,
    calls: Counters,
}

impl<S: DocumentStore> FaultyStore<S> {
    /// Wrap a store with no faults armed
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_references: Mutex::new(HashSet::new()),
            failing_saves: AtomicU64::new(0),
            fail_inserts: AtomicBool::new(false),
            fail_counts: AtomicBool::new(false),
            fail_bulk_updates: AtomicBool::new(false),
            stamp_collisions: AtomicU64::new(0),
            calls: Counters::default(),
        }
    }

    /// Wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every save of the record with this reference
    pub fn fail_saves_for(&self, reference: impl Into<String>) {
        self.failing_references.lock().insert(reference.into());
    }

    /// Fail the next `n` saves, whatever the record
    pub fn fail_next_saves(&self, n: u64) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// Fail every insert while set
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Fail every count while set
    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    /// Fail every bulk update while set
    pub fn fail_bulk_updates(&self, fail: bool) {
        self.fail_bulk_updates.store(fail, Ordering::SeqCst);
    }

    /// Report the next `n` stamp lookups as taken
    ///
    /// A stamp lookup is a `count` whose query has a `stamp` condition.
    pub fn collide_stamps(&self, n: u64) {
        self.stamp_collisions.store(n, Ordering::SeqCst);
    }

    /// Disarm every fault
    pub fn heal(&self) {
        self.failing_references.lock().clear();
        self.failing_saves.store(0, Ordering::SeqCst);
        self.fail_inserts.store(false, Ordering::SeqCst);
        self.fail_counts.store(false, Ordering::SeqCst);
        self.fail_bulk_updates.store(false, Ordering::SeqCst);
        self.stamp_collisions.store(0, Ordering::SeqCst);
    }

    /// Calls made so far
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            count: self.calls.count.load(Ordering::SeqCst),
            find_one: self.calls.find_one.load(Ordering::SeqCst),
            find: self.calls.find.load(Ordering::SeqCst),
            save: self.calls.save.load(Ordering::SeqCst),
            insert: self.calls.insert.load(Ordering::SeqCst),
            bulk_update: self.calls.bulk_update.load(Ordering::SeqCst),
        }
    }
}

/// Decrement a countdown, returning whether it was armed
fn take(counter: &AtomicU64) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl<S: DocumentStore> DocumentStore for FaultyStore<S> {
    fn count(&self, query: &Query) -> Result<u64> {
        self.calls.count.fetch_add(1, Ordering::SeqCst);
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(Error::storage("injected count failure"));
        }
        if query.condition(fields::STAMP).is_some() && take(&self.stamp_collisions) {
            debug!("forcing stamp collision");
            return Ok(1);
        }
        self.inner.count(query)
    }

    fn find_one(&self, query: &Query) -> Result<Option<Record>> {
        self.calls.find_one.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(query)
    }

    fn find(
        &self,
        query: &Query,
        skip: u64,
        limit: Option<u64>,
        sort: Option<&Sort>,
    ) -> Result<Vec<Record>> {
        self.calls.find.fetch_add(1, Ordering::SeqCst);
        self.inner.find(query, skip, limit, sort)
    }

    fn save(&self, record: &Record) -> Result<Record> {
        self.calls.save.fetch_add(1, Ordering::SeqCst);
        let targeted = record
            .reference()
            .map(|r| self.failing_references.lock().contains(r))
            .unwrap_or(false);
        if targeted || take(&self.failing_saves) {
            debug!(id = %record.id, "injecting save failure");
            return Err(Error::storage(format!("injected save failure for {}", record.id)));
        }
        self.inner.save(record)
    }

    fn insert(&self, fields: Map<String, Value>) -> Result<Record> {
        self.calls.insert.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::storage("injected insert failure"));
        }
        self.inner.insert(fields)
    }

    fn bulk_update(
        &self,
        query: &Query,
        patch: &[Patch],
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome> {
        self.calls.bulk_update.fetch_add(1, Ordering::SeqCst);
        if self.fail_bulk_updates.load(Ordering::SeqCst) {
            return Err(Error::storage("injected bulk update failure"));
        }
        self.inner.bulk_update(query, patch, settings)
    }
}
