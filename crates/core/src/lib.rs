//! Core types and traits for myelin
//!
//! This crate defines the foundational types used throughout the system:
//! - Record, RecordId: stored documents and their store handles
//! - Status: record lifecycle status
//! - Identity: hash, reference, stamp, short, code and path of a record
//! - Query, Sort: status-scoped equality queries and sort keys
//! - Element, ElementKey: entries of array-valued fields
//! - Patch: update operators for bulk writes
//! - Pagination: page descriptors
//! - EntityConfig: per-entity configuration
//! - Error: error type with step-note chains
//! - Traits: the DocumentStore persistence seam

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod element;
pub mod error;
pub mod identity;
pub mod page;
pub mod patch;
pub mod query;
pub mod record;
pub mod status;
pub mod traits;

pub use config::EntityConfig;
pub use element::{Element, ElementKey};
pub use error::{Error, ErrorClass, Result, ResultExt};
pub use identity::Identity;
pub use page::{Pagination, DEFAULT_PAGE_SIZE};
pub use patch::{Patch, UpdateOutcome, UpdateSettings};
pub use query::{compare_values, Query, Sort, SortOrder, StatusScope};
pub use record::{fields, Record, RecordId};
pub use status::Status;
pub use traits::DocumentStore;
