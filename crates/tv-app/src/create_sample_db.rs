//! Create a sample SQLite database with the demo data

use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value as JsonValue};

use crate::demo::{demo_collections, DEMO_DATABASE};

/// Flatten one level of nesting into `parent.child` columns
fn flatten(document: &JsonValue) -> Vec<(String, SqlValue)> {
    fn scalar(value: &JsonValue) -> SqlValue {
        match value {
            JsonValue::Bool(b) => SqlValue::Integer(*b as i64),
            JsonValue::Number(n) => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            JsonValue::String(s) => SqlValue::Text(s.clone()),
            _ => SqlValue::Null,
        }
    }

    let empty = Map::new();
    let object = document.as_object().unwrap_or(&empty);
    let mut columns = Vec::new();
    for (key, value) in object {
        match value {
            JsonValue::Object(inner) => {
                for (child, value) in inner {
                    columns.push((format!("{}.{}", key, child), scalar(value)));
                }
            }
            value => columns.push((key.clone(), scalar(value))),
        }
    }
    columns
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Write `<dir>/telemetry.db`, replacing any previous file. Returns its path.
pub fn create_sample_database(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.db", DEMO_DATABASE));
    if path.exists() {
        std::fs::remove_file(&path)?;
    }

    let mut conn = Connection::open(&path)?;
    let tx = conn.transaction()?;

    for (collection, documents) in demo_collections() {
        let rows: Vec<Vec<(String, SqlValue)>> = documents.iter().map(flatten).collect();

        // Union of every column, in first-seen order
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for (column, _) in row {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let definitions: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        tx.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote(collection),
            definitions.join(", ")
        ))?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(collection),
            definitions.join(", "),
            placeholders
        ))?;

        for row in rows {
            let values = columns.iter().map(|column| {
                row.iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(SqlValue::Null)
            });
            insert.execute(params_from_iter(values))?;
        }
    }

    tx.commit()?;
    Ok(path)
}
