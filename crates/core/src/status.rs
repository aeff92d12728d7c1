//! Record lifecycle status
//!
//! Every record carries exactly one status. Reads and writes are scoped to
//! [`Status::Active`] unless the caller names another status explicitly, so a
//! disabled or removed record is invisible to default-scoped operations.
//!
//! `Removed` is terminal only by convention: nothing here forbids a caller
//! from querying removed records and writing to them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Record lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Visible to default-scoped reads (initial status)
    Active,
    /// Hidden from default-scoped reads, can be resumed
    Disabled,
    /// Marked for removal; never physically deleted by this layer
    Removed,
    /// Reserved; not reachable through any transition
    Locked,
}

impl Status {
    /// All statuses, in declaration order
    pub const ALL: [Status; 4] = [
        Status::Active,
        Status::Disabled,
        Status::Removed,
        Status::Locked,
    ];

    /// Get the string representation used in stored records
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Disabled => "disabled",
            Status::Removed => "removed",
            Status::Locked => "locked",
        }
    }

    /// Status as a stored field value
    pub fn to_value(self) -> Value {
        Value::String(self.as_str().to_string())
    }

    /// Parse a stored field value
    pub fn from_value(value: &Value) -> Option<Status> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Active
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "disabled" => Ok(Status::Disabled),
            "removed" => Ok(Status::Removed),
            "locked" => Ok(Status::Locked),
            other => Err(Error::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}
