//! Entity capability interface
//!
//! A [`Behavior`] customizes how one entity type prepares its data. Every
//! method has a default; an entity overrides only what it needs and the
//! rest falls back to the defaults through the trait.

use serde_json::{Map, Value};

use myelin_core::{fields, EntityConfig};

/// Per-entity hooks used by the orchestrator
pub trait Behavior: Send + Sync {
    /// Strip fields a caller may never write directly
    ///
    /// The default removes the managed identity fields.
    fn sanitize(&self, data: &mut Map<String, Value>) {
        for field in fields::MANAGED {
            data.remove(field);
        }
    }

    /// Last chance to adjust a record body before its insert
    fn prepare_insert(&self, _fields: &mut Map<String, Value>) {}

    /// Name used as the prefix of a record's `code`
    fn display_name(&self, config: &EntityConfig, _data: &Map<String, Value>) -> String {
        config.name.clone()
    }
}

/// Behavior that keeps every default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl Behavior for DefaultBehavior {}
