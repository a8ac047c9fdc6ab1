//! Columnar to row projection

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, StringBuilder, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use tv_core::{DocumentSet, Value};

use crate::DataError;

static NULL: Value = Value::Null;

/// One document position of a fetch, as shown in the documents table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Index of the row in the fetch, starting at zero
    pub id: usize,
    /// Toggled by the operator; every projected row starts excluded
    pub is_included: bool,
    pub values: IndexMap<String, Value>,
}

impl Row {
    /// Value of a field, `Null` if the field is unknown
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }
}

/// Turns a [`DocumentSet`] into rows
pub struct RowProjector;

impl RowProjector {
    /// One row per index up to the longest column.
    ///
    /// Row `i` takes the `i`-th value of every column; columns shorter
    /// than `i + 1` contribute `Null`. Values are matched by position only,
    /// documents are not assumed to share fields.
    pub fn project(documents: &DocumentSet) -> Vec<Row> {
        let row_count = documents.max_len();

        (0..row_count)
            .map(|id| Row {
                id,
                is_included: false,
                values: documents
                    .columns()
                    .map(|(field, column)| (field.to_string(), column.get(id).cloned().unwrap_or_default()))
                    .collect(),
            })
            .collect()
    }

    /// Render rows as an Arrow batch with an `id` column followed by `fields`.
    ///
    /// A field whose non-null values are all numbers becomes `Float64`, all
    /// booleans becomes `Boolean`, anything else `Utf8`.
    pub fn to_record_batch(rows: &[Row], fields: &[String]) -> Result<RecordBatch, DataError> {
        let mut schema_fields = vec![Field::new("id", DataType::UInt64, false)];
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.len() + 1);

        let mut ids = UInt64Builder::with_capacity(rows.len());
        for row in rows {
            ids.append_value(row.id as u64);
        }
        arrays.push(Arc::new(ids.finish()));

        for field in fields {
            let data_type = Self::infer_type(rows, field);
            let array: ArrayRef = match data_type {
                DataType::Float64 => {
                    let mut builder = Float64Builder::with_capacity(rows.len());
                    for row in rows {
                        builder.append_option(row.get(field).as_f64());
                    }
                    Arc::new(builder.finish())
                }
                DataType::Boolean => {
                    let mut builder = BooleanBuilder::with_capacity(rows.len());
                    for row in rows {
                        builder.append_option(row.get(field).as_bool());
                    }
                    Arc::new(builder.finish())
                }
                _ => {
                    let mut builder = StringBuilder::new();
                    for row in rows {
                        match row.get(field) {
                            Value::Null => builder.append_null(),
                            value => builder.append_value(value.to_string()),
                        }
                    }
                    Arc::new(builder.finish())
                }
            };
            schema_fields.push(Field::new(field, data_type, true));
            arrays.push(array);
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(schema_fields)), arrays)?)
    }

    fn infer_type(rows: &[Row], field: &str) -> DataType {
        let mut values = rows.iter().map(|r| r.get(field)).filter(|v| !v.is_null()).peekable();
        if values.peek().is_none() {
            return DataType::Utf8;
        }

        let mut all_numbers = true;
        let mut all_bools = true;
        for value in values {
            all_numbers &= matches!(value, Value::Number(_));
            all_bools &= matches!(value, Value::Bool(_));
        }

        if all_numbers {
            DataType::Float64
        } else if all_bools {
            DataType::Boolean
        } else {
            DataType::Utf8
        }
    }
}
