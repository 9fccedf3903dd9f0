//! CSV tables, rendered as a row preview plus a per-column summary.

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::RawRecord;

use super::{file_name, read_source};

/// Data rows rendered before the summary takes over.
const PREVIEW_ROWS: usize = 50;
/// Distinct values listed for a low-cardinality text column.
const MAX_LISTED_VALUES: usize = 10;

pub fn load_csv_file(path: &Path) -> Result<Vec<RawRecord>> {
    let bytes = read_source(path)?;
    let parse_err = |e: &dyn std::fmt::Display| Error::parse("CSV", path, e);

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| parse_err(&e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if columns.is_empty() {
        return Err(parse_err(&"no columns to parse"));
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_err(&e))?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }

    let name = file_name(path);
    let content = render(&name, &columns, &rows);

    Ok(vec![RawRecord::new(content, &name, "csv")
        .with("rows", rows.len())
        .with("columns", columns.len())
        .with("column_names", columns)])
}

fn render(name: &str, columns: &[String], rows: &[Vec<String>]) -> String {
    let mut parts = vec![
        format!("CSV File: {}", name),
        format!("Rows: {}, Columns: {}", rows.len(), columns.len()),
        format!("Columns: {}", columns.join(", ")),
        "-".repeat(80),
        "TABLE DATA:".to_string(),
    ];

    let preview = rows.len().min(PREVIEW_ROWS);
    for (i, row) in rows.iter().take(preview).enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .zip(row)
            .map(|(col, val)| format!("{}: {}", col, val))
            .collect();
        parts.push(format!("Row {}: {}", i + 1, cells.join(" | ")));
    }

    if rows.len() > preview {
        parts.push(format!("\n... and {} more rows", rows.len() - preview));
        parts.push("\nDATASET SUMMARY:".to_string());
        for (idx, col) in columns.iter().enumerate() {
            parts.push(format!("\n{}:", col));
            let values: Vec<&str> = rows
                .iter()
                .filter_map(|r| r.get(idx))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect();
            parts.extend(summarize(&values));
        }
    }

    parts.join("\n")
}

/// Summary lines for one column's non-empty values.
fn summarize(values: &[&str]) -> Vec<String> {
    let numbers: Option<Vec<f64>> = values.iter().map(|v| v.parse::<f64>().ok()).collect();
    if let Some(numbers) = numbers.filter(|n| !n.is_empty()) {
        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
        let integral = values.iter().all(|v| v.parse::<i64>().is_ok());
        return vec![format!(
            "  Min: {}, Max: {}, Mean: {:.2}",
            number_text(min, integral),
            number_text(max, integral),
            mean
        )];
    }

    let mut distinct: Vec<&str> = Vec::new();
    for v in values {
        if !distinct.contains(v) {
            distinct.push(*v);
        }
    }
    let mut lines = vec![format!("  Unique values: {}", distinct.len())];
    if distinct.len() <= MAX_LISTED_VALUES {
        lines.push(format!("  Values: {}", distinct.join(", ")));
    }
    lines
}

fn number_text(n: f64, integral: bool) -> String {
    if integral {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
