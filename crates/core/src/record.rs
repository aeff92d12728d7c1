//! Records: the unit of storage managed by myelin
//!
//! A [`Record`] is a JSON object (`fields`) plus two store-owned attributes:
//! its [`RecordId`] and a monotonically increasing `version` used by the
//! store to refuse stale saves.
//!
//! The identity and lifecycle attributes live in `fields` under the names in
//! [`fields`], so that queries address them like any other field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::identity::Identity;
use crate::status::Status;

/// Field names managed by myelin
pub mod fields {
    /// Lifecycle status
    pub const STATUS: &str = "status";
    /// Content fingerprint of the uniqueness factors
    pub const HASH: &str = "hash";
    /// Permanent nonce-based identifier
    pub const REFERENCE: &str = "reference";
    /// Public path-safe code
    pub const STAMP: &str = "stamp";
    /// Six character short code
    pub const SHORT: &str = "short";
    /// Display identifier `<entity>-<stamp>`
    pub const CODE: &str = "code";
    /// Public route `/<entity>/<code>`
    pub const PATH: &str = "path";
    /// Entity name the record belongs to
    pub const MODEL: &str = "model";
    /// Element identifier by name, inside array fields
    pub const NAME: &str = "name";

    /// Server-managed fields a caller may never write directly
    pub const MANAGED: [&str; 7] = [CODE, HASH, MODEL, PATH, REFERENCE, SHORT, STAMP];
}

/// Store-assigned record identifier
///
/// A wrapper around a UUID v4. Distinct from the record's `reference`:
/// the id is the store's handle, the reference is the public identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random RecordId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a RecordId from its string form
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Store-assigned version, bumped on every write
    pub version: u64,
    /// Document body
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record at version 1
    pub fn new(id: RecordId, fields: Map<String, Value>) -> Self {
        Self {
            id,
            version: 1,
            fields,
        }
    }

    /// Get a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a top-level field
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Get a top-level string field
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Lifecycle status; a record without one counts as active
    pub fn status(&self) -> Status {
        self.fields
            .get(fields::STATUS)
            .and_then(Status::from_value)
            .unwrap_or_default()
    }

    /// Content hash, if assigned
    pub fn hash(&self) -> Option<&str> {
        self.str_field(fields::HASH)
    }

    /// Permanent reference, if assigned
    pub fn reference(&self) -> Option<&str> {
        self.str_field(fields::REFERENCE)
    }

    /// Stamp code, if assigned
    pub fn stamp(&self) -> Option<&str> {
        self.str_field(fields::STAMP)
    }

    /// Short code, if assigned
    pub fn short(&self) -> Option<&str> {
        self.str_field(fields::SHORT)
    }

    /// Display code, if assigned
    pub fn code(&self) -> Option<&str> {
        self.str_field(fields::CODE)
    }

    /// Public path, if assigned
    pub fn path(&self) -> Option<&str> {
        self.str_field(fields::PATH)
    }

    /// Full identity bundle, when every identity field is present
    pub fn identity(&self) -> Option<Identity> {
        Some(Identity {
            hash: self.hash()?.to_string(),
            reference: self.reference()?.to_string(),
            stamp: self.stamp()?.to_string(),
            short: self.short()?.to_string(),
            code: self.code()?.to_string(),
            path: self.path()?.to_string(),
        })
    }

    /// Array-valued field, if the field holds an array
    pub fn array(&self, field: &str) -> Option<&Vec<Value>> {
        self.fields.get(field).and_then(Value::as_array)
    }
}
