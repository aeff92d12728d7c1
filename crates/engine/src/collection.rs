//! Collection: one entity type bound to a document store
//!
//! A [`Collection`] composes a [`DocumentStore`], the entity's
//! [`EntityConfig`] and a [`Behavior`]. This module holds its construction
//! and the read side; writes live in `mutation`, `reset` and `element`.
//!
//! ## Status scoping
//!
//! Every read and guard resolves an unspecified status to `active` before
//! it reaches the store. Callers name a status (or use
//! [`Query::any_status`]) to see anything else.

use tracing::{debug, warn};

use myelin_core::{
    DocumentStore, EntityConfig, Error, Pagination, Query, Record, Result, ResultExt,
};

use crate::behavior::{Behavior, DefaultBehavior};
use crate::identity::{generate_salt, IdentityGenerator};
use crate::partition::{normalize, partition, Partition};

/// Count condition for [`Collection::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Exactly this many matches
    Exactly(u64),
    /// At least this many matches
    AtLeast(u64),
    /// At most this many matches
    AtMost(u64),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Exactly(1)
    }
}

impl Condition {
    /// Check a count against this condition
    pub fn holds(&self, count: u64) -> bool {
        match *self {
            Condition::Exactly(n) => count == n,
            Condition::AtLeast(n) => count >= n,
            Condition::AtMost(n) => count <= n,
        }
    }
}

/// Entity type bound to a store
pub struct Collection<S, B = DefaultBehavior> {
    pub(crate) store: S,
    pub(crate) config: EntityConfig,
    pub(crate) salt: String,
    pub(crate) behavior: B,
}

impl<S: DocumentStore> Collection<S, DefaultBehavior> {
    /// Bind a store with the default behavior
    ///
    /// # Errors
    ///
    /// `Config` when the entity config does not validate.
    pub fn new(store: S, config: EntityConfig) -> Result<Self> {
        Self::with_behavior(store, config, DefaultBehavior)
    }
}

impl<S: DocumentStore, B: Behavior> Collection<S, B> {
    /// Bind a store with a custom behavior
    ///
    /// A config without a salt gets a freshly generated one, fixed for the
    /// life of the collection.
    pub fn with_behavior(store: S, config: EntityConfig, behavior: B) -> Result<Self> {
        config.validate()?;
        let salt = config.salt.clone().unwrap_or_else(generate_salt);
        debug!(target: "myelin::collection", entity = %config.name, "collection bound");
        Ok(Self {
            store,
            config,
            salt,
            behavior,
        })
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Entity config
    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// Resolved identity salt
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Entity behavior
    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    /// Identity generator over this collection's store
    pub fn identity(&self) -> IdentityGenerator<'_, S> {
        IdentityGenerator::new(&self.store, &self.config, &self.salt)
    }

    // =========================================================================
    // Counting
    // =========================================================================

    /// Number of records matching the query
    pub fn count(&self, query: &Query) -> Result<u64> {
        self.store
            .count(&query.clone().scoped())
            .remind("failed counting document")
    }

    /// Number of active records
    pub fn total(&self) -> Result<u64> {
        self.count(&Query::new())
    }

    /// Suggested page layout for the records matching the query
    ///
    /// # Errors
    ///
    /// `ZeroCount` when nothing matches.
    pub fn partition_records(&self, query: &Query) -> Result<Partition> {
        let count = self.count(query)?;
        partition(count, self.config.page_size).remind("cannot partition document")
    }

    /// Check the match count against a condition
    pub fn check(&self, query: &Query, condition: Condition) -> Result<bool> {
        Ok(condition.holds(self.count(query)?))
    }

    /// Check that anything matches
    pub fn test(&self, query: &Query) -> Result<bool> {
        self.check(query, Condition::AtLeast(1))
    }

    /// Guard that the query resolves to exactly one record
    ///
    /// # Errors
    ///
    /// `NotFound` on no match, `Ambiguous` on more than one.
    pub fn require_one(&self, query: &Query) -> Result<()> {
        match self.count(query)? {
            0 => Err(Error::NotFound),
            1 => Ok(()),
            count => Err(Error::Ambiguous { count }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// First record matching a non-empty query
    pub fn get(&self, query: &Query) -> Result<Record> {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind("cannot get document");
        }
        self.fetch_one(&query.clone().scoped())
            .remind("failed getting document")
    }

    /// One page of matching records in store order (or the descriptor's sort)
    pub fn list(&self, query: &Query, pagination: Pagination) -> Result<Vec<Record>> {
        self.page(query, pagination).remind("failed listing document")
    }

    /// One page of records matching a non-empty query
    pub fn search(&self, query: &Query, pagination: Pagination) -> Result<Vec<Record>> {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind("cannot search document");
        }
        self.page(query, pagination).remind("failed searching document")
    }

    /// One page of matching records under the descriptor's sort
    pub fn sort(&self, query: &Query, pagination: Pagination) -> Result<Vec<Record>> {
        if pagination.sort.as_ref().map_or(true, |s| s.is_empty()) {
            return Err(Error::EmptySort).remind("cannot sort document");
        }
        self.page(query, pagination).remind("failed sorting document")
    }

    /// Every record of every status
    pub fn all(&self) -> Result<Vec<Record>> {
        let records = self
            .store
            .find(&Query::new().any_status(), 0, None, None)
            .remind("failed getting all document")?;
        if records.is_empty() {
            return Err(Error::NotFound).remind("failed getting all document");
        }
        Ok(records)
    }

    /// Every record matching the query, unpaginated
    pub fn query_records(&self, query: &Query) -> Result<Vec<Record>> {
        self.store
            .find(&query.clone().scoped(), 0, None, None)
            .remind("failed querying document")
    }

    // =========================================================================
    // Helpers shared with the write side
    // =========================================================================

    /// First record matching an already scoped query
    pub(crate) fn fetch_one(&self, scoped: &Query) -> Result<Record> {
        self.store.find_one(scoped)?.ok_or(Error::NotFound)
    }

    /// Query that finds this record again after a write
    ///
    /// Records with a reference are pinned by it, anything else by its
    /// store id. The record's current status is the precondition.
    pub(crate) fn pinned(&self, record: &Record) -> Query {
        let query = match record.reference() {
            Some(reference) => Query::by_reference(reference),
            None => Query::by_id(record.id),
        };
        query.with_status(record.status())
    }

    fn page(&self, query: &Query, pagination: Pagination) -> Result<Vec<Record>> {
        let scoped = query.clone().scoped();
        let count = self.store.count(&scoped)?;
        if count == 0 {
            return Err(Error::NotFound);
        }

        let mut descriptor = pagination;
        if descriptor.size == 0 {
            descriptor.size = self.config.page_size;
        }
        let descriptor = normalize(descriptor, count);

        let records = self.read_page(&scoped, &descriptor)?;
        if !records.is_empty() {
            return Ok(records);
        }
        if descriptor.index == 0 {
            return Err(Error::NotFound);
        }

        warn!(
            target: "myelin::collection",
            index = descriptor.index,
            count,
            "going back to first page"
        );
        let first = Pagination {
            index: 0,
            ..descriptor
        };
        let records = self.read_page(&scoped, &first)?;
        if records.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(records)
    }

    fn read_page(&self, scoped: &Query, descriptor: &Pagination) -> Result<Vec<Record>> {
        self.store.find(
            scoped,
            descriptor.skip(),
            Some(descriptor.size),
            descriptor.sort.as_ref(),
        )
    }
}

impl<S, B> std::fmt::Debug for Collection<S, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("entity", &self.config.name)
            .field("page_size", &self.config.page_size)
            .finish()
    }
}
