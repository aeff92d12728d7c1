//! Record identity and lifecycle orchestration for myelin
//!
//! This crate sits between callers and a [`DocumentStore`](myelin_core::DocumentStore):
//! - Identity: hash, reference, stamp and short code derivation
//! - Partition: page size suggestions and pagination normalization
//! - Lifecycle: the active / disabled / removed state machine
//! - Pipeline: ordered guard and effect steps with context notes
//! - Collection: reads, inserts, edits, bulk writes, transitions,
//!   re-save passes and element mutation for one entity type
//!
//! The store owns persistence; everything here is orchestration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod behavior;
pub mod collection;
pub mod element;
pub mod identity;
pub mod lifecycle;
pub mod mutation;
pub mod partition;
pub mod pipeline;
pub mod reset;

#[cfg(test)]
mod fixtures;

pub use behavior::{Behavior, DefaultBehavior};
pub use collection::{Collection, Condition};
pub use identity::{
    derive_hash, derive_reference, derive_stamp, generate_salt, IdentityGenerator, Stamp,
    SHORT_LENGTH, STAMP_LENGTH,
};
pub use lifecycle::{can_transition, Transition};
pub use mutation::{EditOptions, UpdateReport};
pub use partition::{normalize, partition, Partition, MAX_PAGE_SIZE};
pub use pipeline::Pipeline;
pub use reset::{RebootReport, SaveFailure};
