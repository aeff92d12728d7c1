//! Lifecycle state machine
//!
//! ## Valid Transitions
//! - Disable: active -> disabled
//! - Resume: disabled -> active
//! - Remove: any -> removed
//!
//! `locked` is never entered by a transition. Every transition is a
//! status-only write; nothing here deletes a record.

use serde_json::{Map, Value};

use myelin_core::{fields, Query, Status};

/// High-level status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// active -> disabled
    Disable,
    /// disabled -> active
    Resume,
    /// any -> removed
    Remove,
}

impl Transition {
    /// All transitions
    pub const ALL: [Transition; 3] = [Transition::Disable, Transition::Resume, Transition::Remove];

    /// Status the record ends up in
    pub fn target(&self) -> Status {
        match self {
            Transition::Disable => Status::Disabled,
            Transition::Resume => Status::Active,
            Transition::Remove => Status::Removed,
        }
    }

    /// Status the record must be in, if the transition forces one
    pub fn precondition(&self) -> Option<Status> {
        match self {
            Transition::Disable => Some(Status::Active),
            Transition::Resume => Some(Status::Disabled),
            Transition::Remove => None,
        }
    }

    /// Check if a record in `from` may take this transition
    pub fn admits(&self, from: Status) -> bool {
        self.precondition().map_or(true, |required| required == from)
    }

    /// Caller query with the transition's status precondition applied
    ///
    /// Disable and resume override any caller status. Remove keeps the
    /// caller's status, defaulting to active.
    pub fn scope(&self, query: &Query) -> Query {
        match self.precondition() {
            Some(status) => query.clone().with_status(status),
            None => query.clone().scoped(),
        }
    }

    /// Status-only payload of the write
    pub fn data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(fields::STATUS.to_string(), self.target().to_value());
        data
    }

    /// Verb used in operation names
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Disable => "disable",
            Transition::Resume => "resume",
            Transition::Remove => "remove",
        }
    }

    /// Progressive form used in failure notes
    pub fn progressive(&self) -> &'static str {
        match self {
            Transition::Disable => "disabling",
            Transition::Resume => "resuming",
            Transition::Remove => "removing",
        }
    }

    /// Note attached to any failure of this transition
    pub fn failure_note(&self) -> &'static str {
        match self {
            Transition::Disable => "failed disabling document",
            Transition::Resume => "failed resuming document",
            Transition::Remove => "failed removing document",
        }
    }
}

/// Check if a status change is reachable through some transition
pub fn can_transition(from: Status, to: Status) -> bool {
    Transition::ALL
        .iter()
        .any(|t| t.target() == to && t.admits(from))
}
