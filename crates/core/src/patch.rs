//! Update operators for bulk writes
//!
//! A [`Patch`] list is the write half of
//! [`DocumentStore::bulk_update`](crate::traits::DocumentStore::bulk_update).
//! Stores apply the whole list to each matching record as one write.
//! [`Patch::apply`] gives in-memory stores the reference semantics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::element::ElementKey;

/// One update operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Patch {
    /// Overwrite top-level fields
    Set(Map<String, Value>),
    /// Append to an array field (creating it if missing)
    Push {
        /// Array field
        field: String,
        /// Value to append
        value: Value,
    },
    /// Append to an array field unless an equal value is already present
    AddToSet {
        /// Array field
        field: String,
        /// Value to add
        value: Value,
    },
    /// Remove every array entry identified by the key
    Pull {
        /// Array field
        field: String,
        /// Identifier of the entries to remove
        key: ElementKey,
    },
    /// Merge fields into every object entry identified by the key
    MergeElement {
        /// Array field
        field: String,
        /// Identifier of the entries to merge into
        key: ElementKey,
        /// Fields to merge
        fields: Map<String, Value>,
    },
}

impl Patch {
    /// Apply this operator to a record body
    ///
    /// Returns whether the body changed. Operators on a field that exists
    /// but is not an array leave the body untouched.
    pub fn apply(&self, body: &mut Map<String, Value>) -> bool {
        match self {
            Patch::Set(data) => {
                let mut changed = false;
                for (field, value) in data {
                    if body.get(field) != Some(value) {
                        body.insert(field.clone(), value.clone());
                        changed = true;
                    }
                }
                changed
            }
            Patch::Push { field, value } => match array_mut(body, field) {
                Some(items) => {
                    items.push(value.clone());
                    true
                }
                None => false,
            },
            Patch::AddToSet { field, value } => match array_mut(body, field) {
                Some(items) if !items.contains(value) => {
                    items.push(value.clone());
                    true
                }
                _ => false,
            },
            Patch::Pull { field, key } => match body.get_mut(field) {
                Some(Value::Array(items)) => {
                    let before = items.len();
                    items.retain(|item| !key.matches(item));
                    items.len() != before
                }
                _ => false,
            },
            Patch::MergeElement { field, key, fields } => match body.get_mut(field) {
                Some(Value::Array(items)) => {
                    let mut changed = false;
                    for item in items.iter_mut().filter(|item| key.matches(item)) {
                        if let Value::Object(entry) = item {
                            for (k, v) in fields {
                                if entry.get(k) != Some(v) {
                                    entry.insert(k.clone(), v.clone());
                                    changed = true;
                                }
                            }
                        }
                    }
                    changed
                }
                _ => false,
            },
        }
    }
}

fn array_mut<'a>(body: &'a mut Map<String, Value>, field: &str) -> Option<&'a mut Vec<Value>> {
    let entry = body
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    entry.as_array_mut()
}

/// Bulk update settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Update every match (`true`) or only the first (`false`)
    pub multi: bool,
}

impl UpdateSettings {
    /// Update only the first match
    pub fn single() -> Self {
        Self { multi: false }
    }

    /// Update every match
    pub fn multi() -> Self {
        Self { multi: true }
    }
}

/// Result of a bulk update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Records that matched the query
    pub matched: u64,
    /// Records whose body actually changed
    pub modified: u64,
}
