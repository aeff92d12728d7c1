//! Testing utilities for code built on a DocumentStore
//!
//! - **FaultyStore**: wrapper that injects save, insert and bulk update
//!   failures, forces stamp collisions and counts collaborator calls
//!
//! # Example
//!
//! ```ignore
//! use myelin_storage::{MemoryStore, testing::FaultyStore};
//!
//! let store = FaultyStore::new(MemoryStore::new());
//! store.collide_stamps(2);
//! store.fail_saves_for("some-reference");
//! ```

mod faulty;

pub use faulty::{CallCounts, FaultyStore};
