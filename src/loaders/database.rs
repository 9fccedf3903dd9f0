//! SQLite database files, one record per table.
//!
//! The file is opened read-only through `sqlx`. Each table record states
//! the row count, column schema and a bounded sample of rows.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};

use crate::error::{Error, Result};
use crate::models::RawRecord;

use super::file_name;

/// Load every user table, sampling at most `limit` rows from each.
pub async fn load_database_file(path: &Path, limit: usize) -> Result<Vec<RawRecord>> {
    let pool = open(path).await?;
    let result = async {
        let mut records = Vec::new();
        for table in list_tables(&pool).await? {
            records.push(describe_table(&pool, path, &table, limit).await?);
        }
        Ok::<_, sqlx::Error>(records)
    }
    .await;
    pool.close().await;
    result.map_err(|e| db_error(path, e))
}

/// Load a single table by name.
pub async fn load_table(path: &Path, table: &str, limit: usize) -> Result<Vec<RawRecord>> {
    let pool = open(path).await?;
    let result = describe_table(&pool, path, table, limit).await;
    pool.close().await;
    Ok(vec![result.map_err(|e| db_error(path, e))?])
}

fn db_error(path: &Path, e: sqlx::Error) -> Error {
    Error::parse("database", path, e)
}

async fn open(path: &Path) -> Result<SqlitePool> {
    if !path.exists() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| db_error(path, e))
}

/// User tables in name order; SQLite's internal tables are excluded.
async fn list_tables(pool: &SqlitePool) -> std::result::Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

async fn describe_table(
    pool: &SqlitePool,
    path: &Path,
    table: &str,
    limit: usize,
) -> std::result::Result<RawRecord, sqlx::Error> {
    let ident = quote_ident(table);

    let schema: Vec<(String, String)> =
        sqlx::query(&format!("PRAGMA table_info({})", ident))
            .fetch_all(pool)
            .await?
            .iter()
            .map(|row| -> std::result::Result<_, sqlx::Error> {
                Ok((row.try_get("name")?, row.try_get("type")?))
            })
            .collect::<std::result::Result<_, _>>()?;
    if schema.is_empty() {
        return Err(sqlx::Error::RowNotFound);
    }
    let columns: Vec<&str> = schema.iter().map(|(name, _)| name.as_str()).collect();

    let row_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", ident))
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(&format!("SELECT * FROM {} LIMIT {}", ident, limit))
        .fetch_all(pool)
        .await?;

    let mut parts = vec![
        format!("TABLE: {}", table),
        format!("Total Rows: {}", row_count),
        format!("Columns: {}", columns.join(", ")),
        "-".repeat(80),
        "SCHEMA:".to_string(),
    ];
    for (name, ty) in &schema {
        parts.push(format!("  {}: {}", name, ty));
    }

    parts.push("\nSAMPLE DATA:".to_string());
    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{}: {}", col, value_text(row, i)))
            .collect();
        parts.push(format!("  {}", cells.join(" | ")));
    }

    if row_count > limit as i64 {
        parts.push(format!("\n... and {} more rows", row_count - limit as i64));
    }

    let source = format!("{}::{}", file_name(path), table);
    Ok(RawRecord::new(parts.join("\n"), &source, "database_table")
        .with("table", table)
        .with("row_count", row_count)
        .with("column_count", columns.len()))
}

/// Render one cell by its stored (dynamic) SQLite type.
fn value_text(row: &SqliteRow, index: usize) -> String {
    let Ok(raw) = row.try_get_raw(index) else {
        return String::new();
    };
    if raw.is_null() {
        return "NULL".to_string();
    }
    let type_name = raw.type_info().name().to_string();
    let text = match type_name.as_str() {
        "INTEGER" => row.try_get_unchecked::<i64, _>(index).map(|v| v.to_string()),
        "REAL" => row.try_get_unchecked::<f64, _>(index).map(|v| v.to_string()),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|v| format!("<{} bytes>", v.len())),
        _ => row.try_get_unchecked::<String, _>(index),
    };
    text.unwrap_or_default()
}
