//! Identity bundle
//!
//! The output of one identity generation cycle, merged into a record's
//! fields before its first insert and discarded afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::fields;

/// Hash, reference, stamp, short code, display code and public path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Content fingerprint (hex digest of factors and difference salt)
    pub hash: String,
    /// Permanent nonce-based identifier
    pub reference: String,
    /// Collision-checked 12 character public code
    pub stamp: String,
    /// 6 character short code
    pub short: String,
    /// `<entity>-<stamp>`
    pub code: String,
    /// `/<entity>/<code>`
    pub path: String,
}

impl Identity {
    /// Write every identity field into a record body
    pub fn merge_into(&self, target: &mut Map<String, Value>) {
        target.insert(fields::HASH.into(), Value::String(self.hash.clone()));
        target.insert(fields::REFERENCE.into(), Value::String(self.reference.clone()));
        target.insert(fields::STAMP.into(), Value::String(self.stamp.clone()));
        target.insert(fields::SHORT.into(), Value::String(self.short.clone()));
        target.insert(fields::CODE.into(), Value::String(self.code.clone()));
        target.insert(fields::PATH.into(), Value::String(self.path.clone()));
    }
}
