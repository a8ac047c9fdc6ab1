//! Field catalog of the selected collection

use serde::{Deserialize, Serialize};

/// One field of a collection with its include and sort checkboxes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub field: String,
    pub is_included: bool,
    pub is_sorted: bool,
}

impl FieldEntry {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            is_included: false,
            is_sorted: false,
        }
    }
}

/// Ordered field entries of one collection.
///
/// Built fresh on every collection selection; nothing carries over from the
/// previous collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    collection: String,
    entries: Vec<FieldEntry>,
}

impl FieldCatalog {
    /// Catalog with every flag cleared
    pub fn from_keys<I, S>(collection: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection: collection.into(),
            entries: keys.into_iter().map(FieldEntry::new).collect(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|e| e.field == field)
    }

    /// Returns false if the field is not in the catalog
    pub fn set_included(&mut self, field: &str, included: bool) -> bool {
        self.entry_mut(field).map(|e| e.is_included = included).is_some()
    }

    /// Returns false if the field is not in the catalog
    pub fn set_sorted(&mut self, field: &str, sorted: bool) -> bool {
        self.entry_mut(field).map(|e| e.is_sorted = sorted).is_some()
    }

    pub fn include_all(&mut self) {
        for entry in &mut self.entries {
            entry.is_included = true;
        }
    }

    fn entry_mut(&mut self, field: &str) -> Option<&mut FieldEntry> {
        self.entries.iter_mut().find(|e| e.field == field)
    }
}
