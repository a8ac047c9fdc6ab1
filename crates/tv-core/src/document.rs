//! Columnar document results

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A fetch result shaped as `field -> values`.
///
/// Columns keep the order of the requested fields. A document that lacks a
/// field contributes nothing to that field's column, so columns can have
/// different lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSet {
    columns: IndexMap<String, Vec<Value>>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty columns for each field, in order
    pub fn with_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let columns = fields
            .iter()
            .map(|f| (f.as_ref().to_string(), Vec::new()))
            .collect();
        Self { columns }
    }

    /// Append a value to a column, creating the column if needed
    pub fn push(&mut self, field: &str, value: Value) {
        match self.columns.get_mut(field) {
            Some(column) => column.push(value),
            None => {
                self.columns.insert(field.to_string(), vec![value]);
            }
        }
    }

    /// Replace a whole column
    pub fn insert_column(&mut self, field: impl Into<String>, values: Vec<Value>) {
        self.columns.insert(field.into(), values);
    }

    pub fn column(&self, field: &str) -> Option<&[Value]> {
        self.columns.get(field).map(|c| c.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Length of the longest column
    pub fn max_len(&self) -> usize {
        self.columns.values().map(|c| c.len()).max().unwrap_or(0)
    }

    /// True when no column holds a value
    pub fn is_empty(&self) -> bool {
        self.max_len() == 0
    }
}

impl FromIterator<(String, Vec<Value>)> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Value>)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
