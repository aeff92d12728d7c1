//! Elements of array-valued fields
//!
//! An element lives inside an array field of exactly one record. Object
//! elements are identified by their `reference` (or, failing that, their
//! `name`); scalar elements are identified by their raw value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::record::fields;

/// A value inside an array field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    /// Object element, identified by `reference` or `name`
    Object(Map<String, Value>),
    /// Scalar element, identified by its value
    Scalar(Value),
}

impl Element {
    /// Classify a raw value
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Element::Object(map),
            other => Element::Scalar(other),
        }
    }

    /// Raw value as stored in the array
    pub fn into_value(self) -> Value {
        match self {
            Element::Object(map) => Value::Object(map),
            Element::Scalar(value) => value,
        }
    }

    /// Borrowed raw value
    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }

    /// Check if this is an object element
    pub fn is_object(&self) -> bool {
        matches!(self, Element::Object(_))
    }

    /// Identifier of this element within its array
    ///
    /// # Errors
    ///
    /// `InvalidInput` when an object element has neither a string
    /// `reference` nor a string `name`, or a scalar element is an array or
    /// null.
    pub fn key(&self) -> Result<ElementKey> {
        match self {
            Element::Object(map) => {
                if let Some(reference) = map.get(fields::REFERENCE).and_then(Value::as_str) {
                    Ok(ElementKey::Reference(reference.to_string()))
                } else if let Some(name) = map.get(fields::NAME).and_then(Value::as_str) {
                    Ok(ElementKey::Name(name.to_string()))
                } else {
                    Err(Error::InvalidInput(
                        "object element needs a reference or a name".to_string(),
                    ))
                }
            }
            Element::Scalar(Value::Null) | Element::Scalar(Value::Array(_)) => Err(
                Error::InvalidInput("scalar element must not be null or an array".to_string()),
            ),
            Element::Scalar(value) => Ok(ElementKey::Value(value.clone())),
        }
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::from_value(value)
    }
}

/// How an element is found inside its array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKey {
    /// Object element with this `reference`
    Reference(String),
    /// Object element with this `name`
    Name(String),
    /// Scalar element equal to this value
    Value(Value),
}

impl ElementKey {
    /// Storage path of the identifier inside the record
    ///
    /// `<field>.reference`, `<field>.name`, or `<field>` for scalars.
    pub fn path(&self, field: &str) -> String {
        match self {
            ElementKey::Reference(_) => format!("{}.{}", field, fields::REFERENCE),
            ElementKey::Name(_) => format!("{}.{}", field, fields::NAME),
            ElementKey::Value(_) => field.to_string(),
        }
    }

    /// Value the path must equal
    pub fn value(&self) -> Value {
        match self {
            ElementKey::Reference(s) | ElementKey::Name(s) => Value::String(s.clone()),
            ElementKey::Value(v) => v.clone(),
        }
    }

    /// Check if an array entry is identified by this key
    pub fn matches(&self, item: &Value) -> bool {
        match self {
            ElementKey::Reference(r) => {
                item.get(fields::REFERENCE).and_then(Value::as_str) == Some(r.as_str())
            }
            ElementKey::Name(n) => item.get(fields::NAME).and_then(Value::as_str) == Some(n.as_str()),
            ElementKey::Value(v) => item == v,
        }
    }
}
