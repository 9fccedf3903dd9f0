//! Store and data-directory overview.
//!
//! Provides a quick summary of what's indexed: whether the store exists,
//! how many chunks it holds per source, and which recognized files sit in
//! the ingestion root. Used by `docqa status`.

use anyhow::Result;

use crate::config::Config;
use crate::loaders::{self, Format};
use crate::store::VectorStore;

/// Snapshot of the store and ingestion root.
#[derive(Debug, Default)]
pub struct Status {
    pub ready: bool,
    /// Size of the index file in bytes; 0 when absent.
    pub index_bytes: u64,
    pub chunks: i64,
    pub sources: Vec<(String, i64)>,
    /// Recognized files in the data directory with their size in bytes.
    pub files: Vec<(String, u64)>,
}

/// Collect the status without printing. Never creates the store.
pub async fn collect_status(config: &Config) -> Result<Status> {
    let mut status = Status::default();

    if let Some(store) = VectorStore::open_existing(&config.paths.store_dir).await? {
        status.chunks = store.count().await?;
        status.sources = store.source_counts().await?;
        status.ready = status.chunks > 0;
        store.close().await;
        status.index_bytes = std::fs::metadata(config.index_path())
            .map(|m| m.len())
            .unwrap_or(0);
    }

    if config.paths.data_dir.is_dir() {
        for path in loaders::list_files(&config.paths.data_dir) {
            if Format::from_path(&path).is_none() {
                continue;
            }
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            status.files.push((loaders::file_name(&path), size));
        }
    }

    Ok(status)
}

/// Run the status command: inspect the store and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let status = collect_status(config).await?;

    println!("docqa status");
    println!("============");
    println!();
    println!("  Index:       {}", config.index_path().display());
    println!("  Size:        {}", format_kb(status.index_bytes));
    println!(
        "  State:       {}",
        if status.ready { "Ready" } else { "Empty" }
    );
    println!("  Chunks:      {}", status.chunks);

    if !status.sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<48} {:>8}", "SOURCE", "CHUNKS");
        println!("  {}", "-".repeat(57));
        for (source, count) in &status.sources {
            println!("  {:<48} {:>8}", source, count);
        }
    }

    println!();
    println!("  Data dir:    {}", config.paths.data_dir.display());
    if status.files.is_empty() {
        println!("  No documents uploaded yet.");
    } else {
        println!("  Files:       {}", status.files.len());
        for (name, size) in &status.files {
            println!("    {} ({})", name, format_kb(*size));
        }
    }
    println!();

    Ok(())
}

/// Format a byte count in kilobytes with one decimal.
fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}
