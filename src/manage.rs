//! File and store management commands: `add`, `remove`, `table`,
//! `delete-store`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::Config;
use crate::loaders::{self, database, Format, SUPPORTED_EXTENSIONS};
use crate::models::RawRecord;
use crate::store;

/// Copy `files` into the data directory, creating it if needed.
///
/// Every file is checked before anything is copied: an unsupported
/// extension or a missing file fails the whole call. Returns the copied
/// destination paths.
pub fn add_files(config: &Config, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    for file in files {
        if Format::from_path(file).is_none() {
            bail!(
                "Unsupported file type: {} (supported: {})",
                file.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            );
        }
        if !file.is_file() {
            bail!("File not found: {}", file.display());
        }
    }

    let data_dir = &config.paths.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let mut copied = Vec::with_capacity(files.len());
    for file in files {
        let dest = data_dir.join(loaders::file_name(file));
        std::fs::copy(file, &dest)
            .with_context(|| format!("Failed to copy {} to {}", file.display(), dest.display()))?;
        info!(file = %dest.display(), "file added");
        copied.push(dest);
    }
    Ok(copied)
}

/// Delete one file from the data directory by bare name.
///
/// Returns `false` when no such file exists. Names containing a path
/// separator or `..` are rejected.
pub fn remove_file(config: &Config, name: &str) -> Result<bool> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".."
    {
        bail!("Invalid file name: {}", name);
    }
    let path = config.paths.data_dir.join(name);
    if !path.is_file() {
        return Ok(false);
    }
    std::fs::remove_file(&path)
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    info!(file = %path.display(), "file removed");
    Ok(true)
}

/// Describe one table of a SQLite file, sampling `database.table_row_limit`
/// rows. A bare file name is looked up in the data directory first.
pub async fn inspect_table(config: &Config, file: &Path, table: &str) -> Result<RawRecord> {
    let in_data_dir = config.paths.data_dir.join(file);
    let path = if file.components().count() == 1 && in_data_dir.is_file() {
        in_data_dir
    } else {
        file.to_path_buf()
    };
    let mut records = database::load_table(&path, table, config.database.table_row_limit)
        .await
        .with_context(|| format!("Failed to read table {} from {}", table, path.display()))?;
    records
        .pop()
        .with_context(|| format!("No record for table {}", table))
}

/// `docqa add <files…>`
pub fn run_add(config: &Config, files: &[PathBuf]) -> Result<()> {
    let copied = add_files(config, files)?;
    for dest in &copied {
        println!("added {}", dest.display());
    }
    println!(
        "{} file(s) added. Run `docqa ingest` to index them.",
        copied.len()
    );
    Ok(())
}

/// `docqa remove <file>`
pub fn run_remove(config: &Config, name: &str) -> Result<()> {
    if remove_file(config, name)? {
        println!("Removed {}", name);
    } else {
        println!("File not found: {}", name);
    }
    Ok(())
}

/// `docqa table <file> <table>`
pub async fn run_table(config: &Config, file: &Path, table: &str) -> Result<()> {
    let record = inspect_table(config, file, table).await?;
    println!("{}", record.content);
    Ok(())
}

/// `docqa delete-store` / `docqa reset`
pub async fn run_delete_store(config: &Config) -> Result<()> {
    let dir: &Path = &config.paths.store_dir;
    if store::delete_store(dir).await? {
        println!("Vector store deleted: {}", dir.display());
    } else {
        println!("No vector store found at {}", dir.display());
    }
    Ok(())
}
