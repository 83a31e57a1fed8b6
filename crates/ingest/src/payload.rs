//! The normalized payload and the field aggregation rule.
//!
//! Fields and files share one name space. The first occurrence of a name is
//! stored bare; the second turns the entry into an ordered list of both; later
//! occurrences append. Keys keep first-occurrence order.
//!
//! ```rust
//! use ingest::{FieldEntry, ParsedPayload, ParsedValue};
//!
//! let mut payload = ParsedPayload::new();
//! payload.put("tag", ParsedValue::String("a".into()));
//! payload.put("name", ParsedValue::String("Jo".into()));
//! payload.put("tag", ParsedValue::String("b".into()));
//!
//! assert_eq!(payload.keys().collect::<Vec<_>>(), ["tag", "name"]);
//! assert!(matches!(payload.get("tag"), Some(FieldEntry::Multiple(values)) if values.len() == 2));
//! ```
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{ParsedFile, ParsedValue};

/// Value stored under one field name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldEntry {
    /// The name occurred once.
    Single(ParsedValue),
    /// The name occurred more than once; values in arrival order.
    Multiple(Vec<ParsedValue>),
}

impl FieldEntry {
    /// First value stored under the name.
    pub fn first(&self) -> Option<&ParsedValue> {
        match self {
            FieldEntry::Single(value) => Some(value),
            FieldEntry::Multiple(values) => values.first(),
        }
    }

    /// All values in arrival order.
    pub fn values(&self) -> Vec<&ParsedValue> {
        match self {
            FieldEntry::Single(value) => vec![value],
            FieldEntry::Multiple(values) => values.iter().collect(),
        }
    }
}

/// Insertion-ordered mapping from field name to its value(s).
///
/// Serializes as a JSON object; see [`ParsedValue`] for how values render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedPayload {
    entries: IndexMap<String, FieldEntry>,
}

impl ParsedPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one occurrence of `name`, aggregating repeated names.
    pub fn put(&mut self, name: impl Into<String>, value: ParsedValue) {
        match self.entries.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(FieldEntry::Single(value));
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                match entry {
                    FieldEntry::Multiple(values) => values.push(value),
                    FieldEntry::Single(_) => {
                        let placeholder = FieldEntry::Multiple(Vec::with_capacity(2));
                        if let FieldEntry::Single(first) = std::mem::replace(entry, placeholder) {
                            *entry = FieldEntry::Multiple(vec![first, value]);
                        }
                    }
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.entries.get(name)
    }

    /// All values stored under `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&ParsedValue> {
        self.entries
            .get(name)
            .map(FieldEntry::values)
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes and returns the entry for `name`, keeping the order of the rest.
    pub fn take(&mut self, name: &str) -> Option<FieldEntry> {
        self.entries.shift_remove(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every file in the payload, in key order then arrival order.
    pub fn files(&self) -> Vec<&ParsedFile> {
        self.entries
            .values()
            .flat_map(FieldEntry::values)
            .filter_map(ParsedValue::as_file)
            .collect()
    }

    pub fn into_inner(self) -> IndexMap<String, FieldEntry> {
        self.entries
    }
}

impl IntoIterator for ParsedPayload {
    type Item = (String, FieldEntry);
    type IntoIter = indexmap::map::IntoIter<String, FieldEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
