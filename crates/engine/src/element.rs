//! Element mutation inside array fields
//!
//! Every element operation first pins exactly one record (more than one
//! match is a hard failure), then works element by element in order. A
//! failing element stops the batch; elements before it stay applied.
//!
//! - push: element must be absent; objects are appended, scalars are added
//!   set-wise; presence is checked afterwards.
//! - pull: element must be present; every entry with the element's key is
//!   removed; absence is checked afterwards.
//! - replace: element must be present; the object's fields are merged into
//!   the matching entry. Batches keep the first element per key. There is
//!   no post-check.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use myelin_core::{
    DocumentStore, Element, ElementKey, Error, Patch, Query, Record, Result, ResultExt,
    UpdateSettings,
};

use crate::behavior::Behavior;
use crate::collection::Collection;
use crate::pipeline::Pipeline;

impl<S: DocumentStore, B: Behavior> Collection<S, B> {
    /// Check whether an element is present in `field` of exactly one record
    pub fn check_element(&self, query: &Query, field: &str, element: &Element) -> Result<bool> {
        let key = element.key().remind("cannot check element")?;
        let scoped = query.clone().scoped();
        self.require_one(&scoped)
            .remind("document check before element")?;
        self.element_present(&scoped, field, &key)
            .remind("failed checking element")
    }

    /// Append one element
    pub fn push_element(&self, query: &Query, field: &str, element: Element) -> Result<Record> {
        self.push_elements(query, field, vec![element])
    }

    /// Append elements one after another
    pub fn push_elements(
        &self,
        query: &Query,
        field: &str,
        elements: Vec<Element>,
    ) -> Result<Record> {
        self.each_element("push", "failed pushing element", query, elements, |pinned, element| {
            self.push_one(pinned, field, element)
        })
    }

    /// Remove one element
    pub fn pull_element(&self, query: &Query, field: &str, element: Element) -> Result<Record> {
        self.pull_elements(query, field, vec![element])
    }

    /// Remove elements one after another
    pub fn pull_elements(
        &self,
        query: &Query,
        field: &str,
        elements: Vec<Element>,
    ) -> Result<Record> {
        self.each_element("pull", "failed pulling element", query, elements, |pinned, element| {
            self.pull_one(pinned, field, element)
        })
    }

    /// Merge one object element into its existing entry
    pub fn replace_element(
        &self,
        query: &Query,
        field: &str,
        element: Element,
    ) -> Result<Record> {
        self.replace_elements(query, field, vec![element])
    }

    /// Merge object elements into their existing entries
    ///
    /// When two elements share a key only the first is applied.
    pub fn replace_elements(
        &self,
        query: &Query,
        field: &str,
        elements: Vec<Element>,
    ) -> Result<Record> {
        let mut seen = Vec::new();
        let mut unique = Vec::with_capacity(elements.len());
        for element in elements {
            let key = element.key().remind("cannot replace element")?;
            if !seen.contains(&key) {
                seen.push(key);
                unique.push(element);
            }
        }
        self.each_element("replace", "failed replacing element", query, unique, |pinned, element| {
            self.replace_one(pinned, field, element)
        })
    }

    /// Overwrite a whole field, provided `element` is present in it
    pub fn replace_field(
        &self,
        query: &Query,
        field: &str,
        element: &Element,
        value: Value,
    ) -> Result<Record> {
        let key = element.key().remind("cannot replace element")?;
        self.each_element("replace field", "failed replacing element", query, vec![()], |pinned, _| {
            if !self.element_present(pinned, field, &key)? {
                return Err(Error::ElementMissing {
                    field: field.to_string(),
                });
            }
            let mut data = Map::new();
            data.insert(field.to_string(), value.clone());
            self.write_element(pinned, Patch::Set(data))
        })
    }

    /// Bring one array field in line with `target`
    ///
    /// Entries whose key is absent from `target` are pulled, object
    /// entries that differ are merged, and new elements are pushed in
    /// target order.
    pub(crate) fn reconcile_array(
        &self,
        pinned: &Query,
        field: &str,
        target: Vec<Value>,
    ) -> Result<()> {
        let current = self
            .fetch_one(pinned)?
            .array(field)
            .cloned()
            .unwrap_or_default();

        let mut wanted = Vec::with_capacity(target.len());
        for value in target {
            let element = Element::from_value(value);
            let key = element.key().remind("cannot reconcile element")?;
            wanted.push((key, element));
        }

        let mut pulled = HashSet::new();
        let mut pulled_keys: Vec<ElementKey> = Vec::new();
        for (index, item) in current.iter().enumerate() {
            let Ok(key) = Element::from_value(item.clone()).key() else {
                continue;
            };
            if wanted.iter().any(|(k, _)| *k == key) {
                continue;
            }
            pulled.insert(index);
            // one pull removes every entry with the key
            if !pulled_keys.contains(&key) {
                self.pull_one(pinned, field, Element::from_value(item.clone()))?;
                pulled_keys.push(key);
            }
        }

        for (key, element) in wanted {
            let existing = current
                .iter()
                .enumerate()
                .find(|(index, item)| !pulled.contains(index) && key.matches(item));
            match existing {
                None => self.push_one(pinned, field, element)?,
                Some((_, item)) if element.is_object() && *item != element.to_value() => {
                    self.replace_one(pinned, field, element)?
                }
                Some(_) => {}
            }
        }
        debug!(target: "myelin::element", field, "array reconciled");
        Ok(())
    }

    // =========================================================================
    // Single-element steps, run against a pinned query
    // =========================================================================

    fn each_element<T, F>(
        &self,
        operation: &'static str,
        failure: &'static str,
        query: &Query,
        items: Vec<T>,
        mut apply: F,
    ) -> Result<Record>
    where
        F: FnMut(&Query, T) -> Result<()>,
    {
        if query.is_empty() {
            return Err(Error::EmptyQuery).remind(format!("cannot {} element", operation));
        }
        if items.is_empty() {
            return Err(Error::EmptyData).remind(format!("cannot {} element", operation));
        }
        let scoped = query.clone().scoped();

        let record = Pipeline::new(operation, failure, items)
            .guard("check", |_| {
                self.require_one(&scoped)
                    .remind("document check before element")
            })?
            .then("pin", |items| {
                let record = self.fetch_one(&scoped)?;
                Ok((items, self.pinned(&record)))
            })?
            .then("apply", |(items, pinned)| {
                for item in items {
                    apply(&pinned, item)?;
                }
                Ok(pinned)
            })?
            .then("reload", |pinned| self.fetch_one(&pinned))?
            .finish();
        Ok(record)
    }

    fn push_one(&self, pinned: &Query, field: &str, element: Element) -> Result<()> {
        let key = element.key()?;
        if self.element_present(pinned, field, &key)? {
            return Err(Error::ElementDuplicate {
                field: field.to_string(),
            })
            .remind("element check before push");
        }
        let patch = if element.is_object() {
            Patch::Push {
                field: field.to_string(),
                value: element.into_value(),
            }
        } else {
            Patch::AddToSet {
                field: field.to_string(),
                value: element.into_value(),
            }
        };
        self.write_element(pinned, patch)?;
        if !self.element_present(pinned, field, &key)? {
            return Err(Error::Unexpected(format!(
                "element missing from '{}' after push",
                field
            )));
        }
        Ok(())
    }

    fn pull_one(&self, pinned: &Query, field: &str, element: Element) -> Result<()> {
        let key = element.key()?;
        if !self.element_present(pinned, field, &key)? {
            return Err(Error::ElementMissing {
                field: field.to_string(),
            })
            .remind("element check before pull");
        }
        self.write_element(
            pinned,
            Patch::Pull {
                field: field.to_string(),
                key: key.clone(),
            },
        )?;
        if self.element_present(pinned, field, &key)? {
            return Err(Error::Unexpected(format!(
                "element still in '{}' after pull",
                field
            )));
        }
        Ok(())
    }

    fn replace_one(&self, pinned: &Query, field: &str, element: Element) -> Result<()> {
        let key = element.key()?;
        let Element::Object(fields) = element else {
            return Err(Error::InvalidInput(
                "scalar elements are replaced through replace_field".to_string(),
            ));
        };
        if !self.element_present(pinned, field, &key)? {
            return Err(Error::ElementMissing {
                field: field.to_string(),
            })
            .remind("element check before replace");
        }
        self.write_element(
            pinned,
            Patch::MergeElement {
                field: field.to_string(),
                key,
                fields,
            },
        )
    }

    fn write_element(&self, pinned: &Query, patch: Patch) -> Result<()> {
        let outcome = self
            .store
            .bulk_update(pinned, &[patch], UpdateSettings::single())?;
        if outcome.matched == 0 {
            return Err(Error::conflict("document changed before the element write"));
        }
        Ok(())
    }

    fn element_present(&self, scoped: &Query, field: &str, key: &ElementKey) -> Result<bool> {
        let query = scoped.clone().and(key.path(field), key.value());
        Ok(self.store.count(&query)? > 0)
    }
}
