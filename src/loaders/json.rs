//! JSON documents, flattened into indented `key: value` lines.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::RawRecord;

use super::{file_name, read_source};

/// Nesting below this depth is elided.
const MAX_DEPTH: usize = 5;
/// Array elements rendered before the `... and N more items` marker.
const MAX_LIST_ITEMS: usize = 10;

pub fn load_json_file(path: &Path) -> Result<Vec<RawRecord>> {
    let bytes = read_source(path)?;
    let data: Value = serde_json::from_slice(&bytes).map_err(|e| Error::parse("JSON", path, e))?;

    let content = flatten(&data);
    let size = data.to_string().len();

    Ok(vec![RawRecord::new(content, &file_name(path), "json").with("size", size)])
}

/// Render a JSON value as readable text.
///
/// Object keys become dotted paths (`a.b.c`), array elements `[i]`. A
/// container's key gets its own line ending in `:` and its contents follow
/// one indent level deeper.
pub fn flatten(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            let mut lines = Vec::new();
            flatten_into(value, "", 0, &mut lines);
            lines.join("\n")
        }
        scalar => scalar_text(scalar),
    }
}

fn flatten_into(value: &Value, parent: &str, depth: usize, lines: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    let indent = "  ".repeat(depth);

    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if parent.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", parent, k)
                };
                push_entry(&key, &key, v, depth, &indent, lines);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().take(MAX_LIST_ITEMS).enumerate() {
                let label = format!("[{}]", i);
                let path = format!("{}[{}]", parent, i);
                push_entry(&label, &path, item, depth, &indent, lines);
            }
            if items.len() > MAX_LIST_ITEMS {
                lines.push(format!(
                    "{}... and {} more items",
                    indent,
                    items.len() - MAX_LIST_ITEMS
                ));
            }
        }
        _ => {}
    }
}

fn push_entry(
    label: &str,
    path: &str,
    value: &Value,
    depth: usize,
    indent: &str,
    lines: &mut Vec<String>,
) {
    if value.is_object() || value.is_array() {
        lines.push(format!("{}{}:", indent, label));
        flatten_into(value, path, depth + 1, lines);
    } else {
        lines.push(format!("{}{}: {}", indent, label, scalar_text(value)));
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
