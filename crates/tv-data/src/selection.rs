//! Field and value selection from catalog and row state

use tv_core::Value;

use crate::catalog::FieldEntry;
use crate::projection::Row;

/// Names of the included fields, in catalog order
pub fn extract_field_selection(catalog: &[FieldEntry]) -> Vec<String> {
    catalog
        .iter()
        .filter(|e| e.is_included)
        .map(|e| e.field.clone())
        .collect()
}

/// Sort flags of the included fields, parallel to [`extract_field_selection`]
pub fn extract_sort_selection(catalog: &[FieldEntry]) -> Vec<bool> {
    catalog
        .iter()
        .filter(|e| e.is_included)
        .map(|e| e.is_sorted)
        .collect()
}

/// Non-null values of `field` from the included rows, in row order
pub fn extract_column(rows: &[Row], field: &str) -> Vec<Value> {
    rows.iter()
        .filter(|row| row.is_included)
        .map(|row| row.get(field))
        .filter(|value| !value.is_null())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn entry(field: &str, is_included: bool, is_sorted: bool) -> FieldEntry {
        FieldEntry {
            field: field.to_string(),
            is_included,
            is_sorted,
        }
    }

    fn row(id: usize, is_included: bool, x: Value) -> Row {
        let mut values = IndexMap::new();
        values.insert("x".to_string(), x);
        Row {
            id,
            is_included,
            values,
        }
    }

    #[test]
    fn test_selection_lists_are_parallel() {
        let catalog = vec![
            entry("time", true, true),
            entry("fps", false, true),
            entry("position", true, false),
        ];

        let fields = extract_field_selection(&catalog);
        let sort = extract_sort_selection(&catalog);

        assert_eq!(fields, vec!["time", "position"]);
        assert_eq!(sort, vec![true, false]);
        assert_eq!(fields.len(), sort.len());
    }

    #[test]
    fn test_empty_catalog() {
        assert!(extract_field_selection(&[]).is_empty());
        assert!(extract_sort_selection(&[]).is_empty());
    }

    #[test]
    fn test_extract_column_skips_excluded_and_null() {
        let rows = vec![
            row(0, true, Value::from(5.0)),
            row(1, false, Value::from(6.0)),
            row(2, true, Value::Null),
        ];

        assert_eq!(extract_column(&rows, "x"), vec![Value::from(5.0)]);
        assert!(extract_column(&rows, "missing").is_empty());
    }
}
