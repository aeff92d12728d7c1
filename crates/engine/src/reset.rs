//! Re-save passes: refresh, reboot and reset
//!
//! A re-save rewrites a record unchanged so the store recomputes whatever
//! it derives on write. `refresh` does this for exactly one record,
//! `reboot` for a whole match set, `reset` picks between them by the
//! number of records a write matched.
//!
//! Reboot saves run concurrently, in waves of `reboot_parallelism` scoped
//! threads. Every save in a wave runs to completion before the wave's
//! failures are looked at, so a failure never cancels its siblings.

use std::thread;

use tracing::{debug, warn};

use myelin_core::{DocumentStore, Error, Query, Record, RecordId, Result, ResultExt};

use crate::behavior::Behavior;
use crate::collection::Collection;
use crate::pipeline::Pipeline;

/// A save skipped during a slack reboot
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFailure {
    /// Record whose save failed
    pub id: RecordId,
    /// Rendered error
    pub error: String,
}

/// Result of a reboot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RebootReport {
    /// Matching records as re-read after the saves
    pub records: Vec<Record>,
    /// Saves that failed and were skipped
    pub failures: Vec<SaveFailure>,
}

impl RebootReport {
    /// Check if every save went through
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<S: DocumentStore, B: Behavior> Collection<S, B> {
    /// Re-save exactly one record and read it back
    pub fn refresh(&self, query: &Query) -> Result<Record> {
        let scoped = query.clone().scoped();
        let record = Pipeline::new("refresh", "failed refreshing document", ())
            .guard("check", |_| {
                self.require_one(&scoped)
                    .remind("document check before refresh")
            })?
            .then("get", |_| self.fetch_one(&scoped))?
            .then("save", |record| {
                self.store.save(&record).remind("failed saving document")
            })?
            .then("reload", |saved| {
                self.store
                    .find_one(&self.pinned(&saved))?
                    .ok_or_else(|| Error::Unexpected(format!("document {} vanished after save", saved.id)))
            })?
            .finish();
        Ok(record)
    }

    /// Re-save every matching record and read the set back
    ///
    /// With `slack`, failed saves are logged and reported in the result.
    /// Without it, any failed save fails the whole reboot with `Batch`
    /// once every sibling save has finished.
    pub fn reboot(&self, query: &Query, slack: bool) -> Result<RebootReport> {
        let scoped = query.clone().scoped();
        let report = Pipeline::new("reboot", "failed rebooting document", ())
            .then("find", |_| self.store.find(&scoped, 0, None, None))?
            .then("save", |records| {
                let failures = self.save_all(&records);
                if failures.is_empty() {
                    return Ok(failures);
                }
                if slack {
                    for failure in &failures {
                        warn!(
                            target: "myelin::reset",
                            entity = %self.config.name,
                            id = %failure.id,
                            error = %failure.error,
                            "skipping failed reboot save"
                        );
                    }
                    return Ok(failures);
                }
                Err(Error::Batch {
                    failed: failures.len(),
                    total: records.len(),
                })
                .remind("failed saving reboot document")
            })?
            .then("reload", |failures| {
                let records = self.store.find(&scoped, 0, None, None)?;
                Ok(RebootReport { records, failures })
            })?
            .finish();
        Ok(report)
    }

    /// Refresh when a write matched at most one record, reboot otherwise
    pub fn reset(&self, query: &Query, matched: u64, slack: bool) -> Result<RebootReport> {
        if matched <= 1 {
            let record = self.refresh(query)?;
            return Ok(RebootReport {
                records: vec![record],
                failures: Vec::new(),
            });
        }
        self.reboot(query, slack)
    }

    fn save_all(&self, records: &[Record]) -> Vec<SaveFailure> {
        let width = self.config.reboot_parallelism.max(1);
        let mut failures = Vec::new();

        for wave in records.chunks(width) {
            debug!(target: "myelin::reset", size = wave.len(), "saving reboot wave");
            let results: Vec<(RecordId, Result<Record>)> = thread::scope(|scope| {
                let handles: Vec<_> = wave
                    .iter()
                    .map(|record| (record.id, scope.spawn(move || self.store.save(record))))
                    .collect();
                handles
                    .into_iter()
                    .map(|(id, handle)| {
                        let result = handle
                            .join()
                            .unwrap_or_else(|_| Err(Error::Unexpected("save panicked".to_string())));
                        (id, result)
                    })
                    .collect()
            });

            failures.extend(results.into_iter().filter_map(|(id, result)| {
                result.err().map(|e| SaveFailure {
                    id,
                    error: e.to_string(),
                })
            }));
        }
        failures
    }
}
