//! Mutation orchestration: inserts, edits, bulk updates and transitions
//!
//! Every operation here is a [`Pipeline`]: guards and effects in a fixed
//! order, stopped at the first failure with the operation's note on top of
//! the failing step's own notes.
//!
//! | Operation | Steps |
//! |-----------|-------|
//! | create / touch | sanitize, identity, insert, refresh |
//! | edit | test, get, overwrite scalars, save, elements, refresh |
//! | update / modify | count, write, reset |
//! | disable / resume / remove | check, get, write, refresh |
//!
//! Effects already applied stay applied when a later step fails, with one
//! exception: a create or touch whose refresh fails marks the inserted
//! record `removed`.

use serde_json::{Map, Value};
use tracing::{info, warn};

use myelin_core::{
    fields, DocumentStore, Error, Patch, Query, Record, RecordId, Result, ResultExt, Status,
    UpdateSettings,
};

use crate::behavior::Behavior;
use crate::collection::Collection;
use crate::lifecycle::Transition;
use crate::pipeline::Pipeline;
use crate::reset::SaveFailure;

/// Options for [`Collection::edit_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditOptions {
    /// Bring array fields in line with the supplied arrays, element by
    /// element, instead of leaving them untouched
    pub reconcile_arrays: bool,
}

/// Result of an update or modify
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Records matched by the write
    pub matched: u64,
    /// Records the write changed
    pub modified: u64,
    /// Records as re-read by the reset step
    pub records: Vec<Record>,
    /// Saves skipped by a slack reset
    pub failures: Vec<SaveFailure>,
}

impl<S: DocumentStore, B: Behavior> Collection<S, B> {
    // =========================================================================
    // Inserts
    // =========================================================================

    /// Insert a record body as-is, defaulting its status to active
    pub fn add(&self, data: Map<String, Value>) -> Result<Record> {
        if data.is_empty() {
            return Err(Error::EmptyData).remind("cannot add document");
        }
        let mut body = data;
        body.entry(fields::STATUS)
            .or_insert_with(|| Status::Active.to_value());
        body.insert(
            fields::MODEL.to_string(),
            Value::String(self.config.name.clone()),
        );
        self.behavior.prepare_insert(&mut body);
        self.store.insert(body).remind("failed adding document")
    }

    /// Insert a record body forced to disabled
    pub fn assume(&self, data: Map<String, Value>) -> Result<Record> {
        if data.is_empty() {
            return Err(Error::EmptyData).remind("cannot add document");
        }
        let mut body = data;
        body.insert(fields::STATUS.to_string(), Status::Disabled.to_value());
        self.add(body)
    }

    /// Create an active record with a fresh identity
    ///
    /// `factors` decide the hash; creating twice from the same factors
    /// fails with a hash duplicate while the first record is active.
    pub fn create(&self, factors: &[Value], data: Map<String, Value>) -> Result<Record> {
        self.insert_new("create", "failed creating document", factors, data, Status::Active)
    }

    /// Create a disabled record with a fresh identity
    pub fn touch(&self, factors: &[Value], data: Map<String, Value>) -> Result<Record> {
        self.insert_new("touch", "failed touching document", factors, data, Status::Disabled)
    }

    fn insert_new(
        &self,
        operation: &'static str,
        failure: &'static str,
        factors: &[Value],
        data: Map<String, Value>,
        status: Status,
    ) -> Result<Record> {
        let mut data = data;
        self.behavior.sanitize(&mut data);
        let display_name = self.behavior.display_name(&self.config, &data);

        let record = Pipeline::new(operation, failure, data)
            .guard("data", |data| {
                if data.is_empty() {
                    Err(Error::EmptyData)
                } else {
                    Ok(())
                }
            })?
            .then("identity", |mut data| {
                let identity = self.identity().generate(factors, &display_name)?;
                identity.merge_into(&mut data);
                Ok(data)
            })?
            .then("insert", |data| match status {
                Status::Disabled => self.assume(data),
                _ => self.add(data),
            })?
            .then("refresh", |inserted| {
                let pinned = self.pinned(&inserted);
                self.refresh(&pinned).map_err(|e| {
                    self.compensate(&inserted, &e);
                    e
                })
            })?
            .finish();

        info!(
            target: "myelin::mutation",
            entity = %self.config.name,
            operation,
            reference = record.reference().unwrap_or_default(),
            "document created"
        );
        Ok(record)
    }

    /// Mark a freshly inserted record removed after a later step failed
    fn compensate(&self, inserted: &Record, cause: &Error) {
        let Some(reference) = inserted.reference() else {
            return;
        };
        warn!(
            target: "myelin::mutation",
            entity = %self.config.name,
            reference,
            error = %cause,
            "removing document inserted by a failed operation"
        );
        let query = Query::by_reference(reference).any_status();
        let patch = [Patch::Set(Transition::Remove.data())];
        if let Err(e) = self
            .store
            .bulk_update(&query, &patch, UpdateSettings::single())
        {
            warn!(target: "myelin::mutation", reference, error = %e, "compensation failed");
        }
    }

    // =========================================================================
    // Edit
    // =========================================================================

    /// Overwrite the scalar fields of exactly one record
    pub fn edit(&self, query: &Query, data: Map<String, Value>) -> Result<Record> {
        self.edit_with(query, data, EditOptions::default())
    }

    /// Overwrite the scalar fields of exactly one record, optionally
    /// reconciling its array fields
    pub fn edit_with(
        &self,
        query: &Query,
        data: Map<String, Value>,
        options: EditOptions,
    ) -> Result<Record> {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind("cannot edit document");
        }
        let mut data = data;
        self.behavior.sanitize(&mut data);
        if data.is_empty() {
            return Err(Error::EmptyData).remind("cannot edit document");
        }
        let scoped = query.clone().scoped();

        let record = Pipeline::new("edit", "failed editing document", data)
            .guard("test", |_| {
                self.require_one(&scoped).remind("document test before edit")
            })?
            .then("get", |data| Ok((data, self.fetch_one(&scoped)?)))?
            .then("overwrite", |(data, mut record)| {
                let mut arrays = Vec::new();
                for (field, value) in data {
                    match value {
                        Value::Array(items) => arrays.push((field, items)),
                        scalar => record.set(field, scalar),
                    }
                }
                record.set(fields::MODEL, Value::String(self.config.name.clone()));
                Ok((arrays, record))
            })?
            .then("save", |(arrays, record)| {
                let saved = self.store.save(&record).remind("failed saving document")?;
                Ok((arrays, saved))
            })?
            .then("elements", |(arrays, saved)| {
                let pinned = self.pinned(&saved);
                if options.reconcile_arrays {
                    for (field, items) in arrays {
                        self.reconcile_array(&pinned, &field, items)?;
                    }
                }
                Ok(pinned)
            })?
            .then("refresh", |pinned| self.refresh(&pinned))?
            .finish();
        Ok(record)
    }

    // =========================================================================
    // Bulk writes
    // =========================================================================

    /// Set scalar fields on every matching record
    ///
    /// Managed and array-valued fields are dropped from `data`. A single
    /// match is written through its pinned query and refreshed; several
    /// matches are written at once and rebooted.
    pub fn update(&self, query: &Query, data: Map<String, Value>) -> Result<UpdateReport> {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind("cannot update document");
        }
        let mut data = data;
        self.behavior.sanitize(&mut data);
        data.retain(|_, value| !value.is_array());
        if data.is_empty() {
            return Err(Error::EmptyData).remind("cannot update document");
        }
        data.insert(
            fields::MODEL.to_string(),
            Value::String(self.config.name.clone()),
        );
        self.bulk_write(
            "update",
            "failed updating document",
            query,
            vec![Patch::Set(data)],
        )
    }

    /// Apply raw update operators to every matching record
    ///
    /// Nothing is stripped: operators may touch managed fields and arrays.
    pub fn modify(&self, query: &Query, patches: Vec<Patch>) -> Result<UpdateReport> {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind("cannot modify document");
        }
        if patches.is_empty() {
            return Err(Error::EmptyData).remind("cannot modify document");
        }
        self.bulk_write("modify", "failed modifying document", query, patches)
    }

    fn bulk_write(
        &self,
        operation: &'static str,
        failure: &'static str,
        query: &Query,
        patches: Vec<Patch>,
    ) -> Result<UpdateReport> {
        let scoped = query.clone().scoped();

        let report = Pipeline::new(operation, failure, patches)
            .then("count", |patches| match self.count(&scoped)? {
                0 => Err(Error::NotFound),
                count => Ok((patches, count)),
            })?
            .then("write", |(patches, count)| {
                let (target, settings, ids) = if count == 1 {
                    let record = self.fetch_one(&scoped)?;
                    (self.pinned(&record), UpdateSettings::single(), vec![record.id])
                } else {
                    let ids: Vec<RecordId> = self
                        .store
                        .find(&scoped, 0, None, None)?
                        .into_iter()
                        .map(|record| record.id)
                        .collect();
                    (scoped.clone().within(ids.clone()), UpdateSettings::multi(), ids)
                };
                let outcome = self.store.bulk_update(&target, &patches, settings)?;
                if outcome.matched == 0 {
                    return Err(Error::conflict("no document matched at write time"));
                }
                Ok((outcome, Query::new().within(ids).any_status()))
            })?
            .then("reset", |(outcome, written)| {
                let reset = self.reset(&written, outcome.matched, self.config.slack)?;
                Ok(UpdateReport {
                    matched: outcome.matched,
                    modified: outcome.modified,
                    records: reset.records,
                    failures: reset.failures,
                })
            })?
            .finish();
        Ok(report)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Move exactly one active record to disabled
    pub fn disable(&self, query: &Query) -> Result<Record> {
        self.transition(Transition::Disable, query)
    }

    /// Move exactly one disabled record back to active
    pub fn resume(&self, query: &Query) -> Result<Record> {
        self.transition(Transition::Resume, query)
    }

    /// Move exactly one record to removed
    ///
    /// The query's own status applies (active when unspecified).
    pub fn remove(&self, query: &Query) -> Result<Record> {
        self.transition(Transition::Remove, query)
    }

    fn transition(&self, transition: Transition, query: &Query) -> Result<Record> {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind(format!("cannot {} document", transition.as_str()));
        }
        let scoped = transition.scope(query);

        let record = Pipeline::new(transition.as_str(), transition.failure_note(), ())
            .guard("check", |_| {
                self.require_one(&scoped)
                    .remind(format!("document check before {}", transition.as_str()))
            })?
            .then("get", |_| self.fetch_one(&scoped))?
            .guard("admits", |record| {
                if transition.admits(record.status()) {
                    Ok(())
                } else {
                    Err(Error::conflict(format!(
                        "document is {}",
                        record.status()
                    )))
                }
            })?
            .then("write", |record| {
                let pinned = self.pinned(&record);
                let data = transition.data();
                let outcome = self.store.bulk_update(
                    &pinned,
                    &[Patch::Set(data.clone())],
                    UpdateSettings::single(),
                )?;
                if outcome.matched == 0 {
                    return Err(Error::conflict("document changed before the write"));
                }
                Ok(pinned.rebased(&data))
            })?
            .then("refresh", |target| self.refresh(&target))?
            .finish();
        Ok(record)
    }
}
