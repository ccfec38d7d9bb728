//! Node content: label, attributes and text payload.
//!
//! Content equality ignores attribute order, while the attribute list keeps
//! insertion order so documents serialize the way they were read.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

use super::delta::Update;
use crate::constants::{CONTROL_FLOW_LABELS, LABEL_KEY, TEXT_KEY};

/// Returns true if `label` names a control-flow node.
pub fn is_control_flow(label: &str) -> bool {
    CONTROL_FLOW_LABELS.contains(&label)
}

/// Ordered attribute map compared as an unordered one.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Attributes {
            entries: Vec::new(),
        }
    }

    /// Returns the value of an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets an attribute, keeping its position if it already exists.
    /// Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Removes an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attributes sorted by name, for order-independent hashing.
    fn sorted(&self) -> Vec<(&str, &str)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_unstable();
        sorted
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Attributes {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// The payload of a tree node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContent {
    /// Element label (e.g. `call`, `parameters`).
    label: String,
    /// Attributes.
    attributes: Attributes,
    /// Optional text payload.
    text: Option<String>,
}

impl NodeContent {
    /// Creates content with the given label and no attributes or text.
    pub fn new(label: impl Into<String>) -> Self {
        NodeContent {
            label: label.into(),
            attributes: Attributes::new(),
            text: None,
        }
    }

    /// Builder: adds an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Builder: sets the text payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replaces the label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the attributes mutably.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Returns an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Returns the text payload.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replaces the text payload.
    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    /// Returns true for control-flow labels.
    pub fn is_control_flow(&self) -> bool {
        is_control_flow(&self.label)
    }

    /// Returns true for property labels.
    pub fn is_property(&self) -> bool {
        !self.is_control_flow()
    }

    /// MD5 digest of label, sorted attributes and text.
    pub fn content_hash(&self) -> [u8; 16] {
        let mut hasher = Md5::new();
        self.hash_into(&mut hasher);
        hasher.finalize().into()
    }

    /// Feeds this content into a running digest.
    pub(crate) fn hash_into(&self, hasher: &mut Md5) {
        hasher.update(self.label.as_bytes());
        hasher.update([0u8]);
        for (k, v) in self.attributes.sorted() {
            hasher.update(k.as_bytes());
            hasher.update([1u8]);
            hasher.update(v.as_bytes());
            hasher.update([0u8]);
        }
        match &self.text {
            Some(text) => {
                hasher.update([2u8]);
                hasher.update(text.as_bytes());
            }
            None => hasher.update([3u8]),
        }
    }

    /// Field-level differences turning `self` into `new`.
    ///
    /// Attributes are keyed by name, the text payload by `"text"` and the
    /// label by `"#label"`.
    pub fn diff_fields(&self, new: &NodeContent) -> BTreeMap<String, Update> {
        let mut updates = BTreeMap::new();
        for (name, old_value) in self.attributes.iter() {
            let new_value = new.attr(name);
            if new_value != Some(old_value) {
                updates.insert(
                    name.to_string(),
                    Update::new(Some(old_value), new_value),
                );
            }
        }
        for (name, new_value) in new.attributes.iter() {
            if !self.attributes.contains(name) {
                updates.insert(name.to_string(), Update::new(None, Some(new_value)));
            }
        }
        if self.text != new.text {
            updates.insert(
                TEXT_KEY.to_string(),
                Update::new(self.text(), new.text()),
            );
        }
        if self.label != new.label {
            updates.insert(
                LABEL_KEY.to_string(),
                Update::new(Some(self.label()), Some(new.label())),
            );
        }
        updates
    }

    /// Reads a field by update key.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            TEXT_KEY => self.text(),
            LABEL_KEY => Some(self.label()),
            _ => self.attr(key),
        }
    }

    /// Writes a field by update key. `None` removes an attribute or the text.
    pub fn set_field(&mut self, key: &str, value: Option<&str>) {
        match key {
            TEXT_KEY => self.text = value.map(str::to_string),
            LABEL_KEY => {
                if let Some(label) = value {
                    self.label = label.to_string();
                }
            }
            _ => match value {
                Some(v) => {
                    self.attributes.insert(key, v);
                }
                None => {
                    self.attributes.remove(key);
                }
            },
        }
    }
}
