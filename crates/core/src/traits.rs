//! Persistence collaborator abstraction
//!
//! This module defines the [`DocumentStore`] trait, the only seam between
//! the orchestrator and whatever actually holds the records. Swapping the
//! in-memory store for a networked one must not touch the layers above.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::patch::{Patch, UpdateOutcome, UpdateSettings};
use crate::query::{Query, Sort};
use crate::record::Record;

/// Document store abstraction
///
/// Thread safety: All methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
///
/// Every method honours the query's status scope. A query whose scope is
/// still [`StatusScope::Default`](crate::query::StatusScope::Default)
/// selects active records only.
pub trait DocumentStore: Send + Sync {
    /// Number of records matching the query
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn count(&self, query: &Query) -> Result<u64>;

    /// First record matching the query, in store order
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn find_one(&self, query: &Query) -> Result<Option<Record>>;

    /// Records matching the query
    ///
    /// # Arguments
    /// * `skip` - Matching records to skip after sorting
    /// * `limit` - Maximum records to return (None = all)
    /// * `sort` - Sort to apply before skipping (None = store order)
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn find(
        &self,
        query: &Query,
        skip: u64,
        limit: Option<u64>,
        sort: Option<&Sort>,
    ) -> Result<Vec<Record>>;

    /// Write a whole record back
    ///
    /// The record's `version` must equal the stored version. On success the
    /// store bumps the version, re-runs its derived computation and returns
    /// the stored record.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` on a stale version, `NotFound` if the record is
    /// gone, or a storage error.
    fn save(&self, record: &Record) -> Result<Record>;

    /// Insert a new record and return it with its assigned id and version
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert(&self, fields: Map<String, Value>) -> Result<Record>;

    /// Apply a patch list to every record matching the query
    ///
    /// The whole list is applied to each record as one write. With
    /// `settings.multi == false` only the first match is written. Because
    /// the query is re-checked under the store's write lock, a condition in
    /// the query works as a compare-and-swap precondition.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn bulk_update(
        &self,
        query: &Query,
        patch: &[Patch],
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    fn count(&self, query: &Query) -> Result<u64> {
        (**self).count(query)
    }

    fn find_one(&self, query: &Query) -> Result<Option<Record>> {
        (**self).find_one(query)
    }

    fn find(
        &self,
        query: &Query,
        skip: u64,
        limit: Option<u64>,
        sort: Option<&Sort>,
    ) -> Result<Vec<Record>> {
        (**self).find(query, skip, limit, sort)
    }

    fn save(&self, record: &Record) -> Result<Record> {
        (**self).save(record)
    }

    fn insert(&self, fields: Map<String, Value>) -> Result<Record> {
        (**self).insert(fields)
    }

    fn bulk_update(
        &self,
        query: &Query,
        patch: &[Patch],
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome> {
        (**self).bulk_update(query, patch, settings)
    }
}
