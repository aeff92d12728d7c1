//! Myelin - record identity and lifecycle orchestration
//!
//! Myelin sits in front of a document store and manages, for one entity
//! type at a time, how records get their identity (hash, reference, stamp,
//! short code, code and path), how they move through the active / disabled
//! / removed lifecycle, and how multi-step writes are guarded and
//! reported.
//!
//! # Quick Start
//!
//! ```ignore
//! use myelin::{Collection, EntityConfig, MemoryStore, Query};
//! use serde_json::json;
//!
//! let users = Collection::new(MemoryStore::new(), EntityConfig::named("user"))?;
//!
//! let alice = users.create(&[json!("alice@example.com")], data)?;
//! users.disable(&Query::by_reference(alice.reference().unwrap()))?;
//! ```
//!
//! # Architecture
//!
//! - `myelin-core`: records, queries, patches, errors, config and the
//!   [`DocumentStore`] contract
//! - `myelin-storage`: [`MemoryStore`], an in-memory store, plus fault
//!   injection for tests
//! - `myelin-engine`: identity, partition, lifecycle and the
//!   [`Collection`] orchestrator

pub use myelin_core::{
    compare_values, fields, DocumentStore, Element, ElementKey, EntityConfig, Error,
    ErrorClass, Identity, Pagination, Patch, Query, Record, RecordId, Result, ResultExt, Sort,
    SortOrder, Status, StatusScope, UpdateOutcome, UpdateSettings, DEFAULT_PAGE_SIZE,
};
pub use myelin_engine::{
    can_transition, derive_hash, derive_reference, derive_stamp, generate_salt, normalize,
    partition, Behavior, Collection, Condition, DefaultBehavior, EditOptions, IdentityGenerator,
    Partition, Pipeline, RebootReport, SaveFailure, Stamp, Transition, UpdateReport,
    MAX_PAGE_SIZE, SHORT_LENGTH, STAMP_LENGTH,
};
pub use myelin_storage::{testing, MemoryStore, SaveHook, CREATED_FIELD, UPDATED_FIELD};
