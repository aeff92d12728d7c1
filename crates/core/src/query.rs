//! Queries and sort keys
//!
//! A [`Query`] is a conjunction of equality conditions on field paths plus a
//! status scope. Path semantics follow the usual document-store rules:
//!
//! - `name` matches when the field equals the value, or when the field is an
//!   array containing the value.
//! - `tags.reference` descends into `tags`; when `tags` is an array, any
//!   element may satisfy the rest of the path.
//! - A condition on `null` also matches a missing field.
//!
//! A query may also be restricted to a set of store ids with
//! [`Query::by_id`] or [`Query::within`]. Pinning a record by id is what
//! lets a write find it again however its fields change.
//!
//! ## Status scope
//!
//! A query that never mentions status is [`StatusScope::Default`], which
//! resolves to `active`. Callers must name a status (or opt out with
//! [`Query::any_status`]) to see disabled or removed records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::record::{fields, Record, RecordId};
use crate::status::Status;

/// Which statuses a query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusScope {
    /// Not specified by the caller; resolves to `active`
    #[default]
    Default,
    /// Exactly this status
    Only(Status),
    /// Every status
    Any,
}

impl StatusScope {
    /// Check if a record status falls in this scope
    pub fn admits(&self, status: Status) -> bool {
        match self {
            StatusScope::Default => status == Status::Active,
            StatusScope::Only(s) => *s == status,
            StatusScope::Any => true,
        }
    }
}

/// Conjunction of field conditions with a status scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    conditions: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conjuncts: Vec<(String, Value)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<RecordId>>,
    status: StatusScope,
}

impl Query {
    /// Empty query (default status scope)
    pub fn new() -> Self {
        Self::default()
    }

    /// Query by permanent reference
    pub fn by_reference(reference: impl Into<String>) -> Self {
        Self::new().eq(fields::REFERENCE, Value::String(reference.into()))
    }

    /// Query by store id
    pub fn by_id(id: RecordId) -> Self {
        Self::new().within(vec![id])
    }

    /// Restrict to records whose store id is in `ids`
    ///
    /// Calling it again narrows the set to the ids present in both.
    pub fn within(mut self, ids: Vec<RecordId>) -> Self {
        self.ids = Some(match self.ids.take() {
            Some(current) => current.into_iter().filter(|id| ids.contains(id)).collect(),
            None => ids,
        });
        self
    }

    /// Add an equality condition on a (dotted) field path
    ///
    /// A condition on `status` sets the status scope instead when the value
    /// is a known status string.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        let path = path.into();
        let value = value.into();
        if path == fields::STATUS {
            if let Some(status) = Status::from_value(&value) {
                self.status = StatusScope::Only(status);
                return self;
            }
        }
        self.conditions.insert(path, value);
        self
    }

    /// Add an equality condition alongside the existing ones
    ///
    /// Unlike [`Query::eq`], this never replaces a condition on the same
    /// path and never touches the status scope.
    pub fn and(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conjuncts.push((path.into(), value.into()));
        self
    }

    /// Restrict to exactly one status
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = StatusScope::Only(status);
        self
    }

    /// Select every status
    pub fn any_status(mut self) -> Self {
        self.status = StatusScope::Any;
        self
    }

    /// Resolve a default status scope to `active`
    pub fn scoped(mut self) -> Self {
        if self.status == StatusScope::Default {
            self.status = StatusScope::Only(Status::Active);
        }
        self
    }

    /// Status scope of this query
    pub fn status(&self) -> StatusScope {
        self.status
    }

    /// Check if the query carries no field conditions
    ///
    /// The status scope does not count as a condition; an id restriction
    /// does.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.conjuncts.is_empty() && self.ids.is_none()
    }

    /// Store ids the query is restricted to, if any
    pub fn ids(&self) -> Option<&[RecordId]> {
        self.ids.as_deref()
    }

    /// Field conditions in path order
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Condition on one path, if any
    pub fn condition(&self, path: &str) -> Option<&Value> {
        self.conditions.get(path)
    }

    /// Re-target this query at the state a `$set` of `data` leaves behind
    ///
    /// Conditions on fields the data overwrites take the new value, and a
    /// status in the data becomes the status scope. Used to find records
    /// again after a write changed the fields they were matched on.
    pub fn rebased(&self, data: &Map<String, Value>) -> Self {
        let mut query = self.clone();
        for (path, value) in query.conditions.iter_mut() {
            if let Some(updated) = data.get(path) {
                *value = updated.clone();
            }
        }
        if let Some(status) = data.get(fields::STATUS).and_then(Status::from_value) {
            query.status = StatusScope::Only(status);
        }
        query
    }

    /// Check if a record satisfies every condition and the status scope
    pub fn matches(&self, record: &Record) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&record.id))
            && self.status.admits(record.status())
            && self.matches_fields(&record.fields)
    }

    /// Check field conditions only, ignoring the status scope
    pub fn matches_fields(&self, body: &Map<String, Value>) -> bool {
        self.conditions
            .iter()
            .chain(self.conjuncts.iter().map(|(path, expected)| (path, expected)))
            .all(|(path, expected)| field_matches(body, path, expected))
    }
}

fn field_matches(body: &Map<String, Value>, path: &str, expected: &Value) -> bool {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();
    match body.get(head) {
        Some(value) => path_matches(value, &rest, expected),
        None => expected.is_null(),
    }
}

fn path_matches(current: &Value, segments: &[&str], expected: &Value) -> bool {
    match segments.split_first() {
        None => {
            current == expected
                || matches!(current, Value::Array(items) if items.contains(expected))
        }
        Some((head, rest)) => match current {
            Value::Object(map) => match map.get(*head) {
                Some(value) => path_matches(value, rest, expected),
                None => expected.is_null(),
            },
            Value::Array(items) => items.iter().any(|item| path_matches(item, segments, expected)),
            _ => false,
        },
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Ordered list of sort keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    keys: Vec<(String, SortOrder)>,
}

impl Sort {
    /// Sort ascending by one field
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::default().then(field, SortOrder::Ascending)
    }

    /// Sort descending by one field
    pub fn descending(field: impl Into<String>) -> Self {
        Self::default().then(field, SortOrder::Descending)
    }

    /// Add a tie-breaking key
    pub fn then(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((field.into(), order));
        self
    }

    /// Check if no key is set
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sort keys in priority order
    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    /// Compare two records under this sort
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for (field, order) in &self.keys {
            let ordering = compare_values(a.get(field), b.get(field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Total order over optional JSON values
///
/// Missing < null < bool < number < string < array < object.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(Some(left), Some(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
