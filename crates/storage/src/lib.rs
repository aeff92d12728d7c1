//! Storage layer for myelin
//!
//! This crate implements the in-memory persistence collaborator:
//! - MemoryStore: BTreeMap-based DocumentStore with RwLock
//! - Per-record versions with stale-save detection
//! - Save hooks standing in for store-side derived fields
//! - Fault injection for tests (`testing` module)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod testing;

pub use memory::{MemoryStore, SaveHook, CREATED_FIELD, UPDATED_FIELD};
