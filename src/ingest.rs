//! Ingestion pipeline orchestration.
//!
//! Coordinates one batch: directory load → chunking → embedding → storage.
//! Re-running ingestion adds the entries again; `--fresh` clears the store
//! first. Per-file load failures are reported but never abort the batch.

use anyhow::{Context, Result};

use crate::chunk::Chunker;
use crate::config::Config;
use crate::embedding;
use crate::loaders::{self, FileFailure};
use crate::store::{self, VectorStore};

/// Outcome of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// `(file name, records)` for every file that loaded.
    pub files: Vec<(String, usize)>,
    pub failures: Vec<FileFailure>,
    pub ignored: usize,
    pub records: usize,
    pub chunks: usize,
    /// Entries written to the store.
    pub stored: usize,
    /// Entries removed by `fresh` before writing.
    pub cleared: u64,
    pub warning: Option<String>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Load every recognized file in `paths.data_dir` and add its chunks to the
/// store in `paths.store_dir`.
///
/// The data directory is created when missing. With `fresh`, existing
/// entries are swapped for the new ones in a single transaction, so a
/// failed run leaves the previous index intact; a fresh run over an empty
/// directory empties the store. No store is created when nothing loaded.
pub async fn ingest_directory(config: &Config, fresh: bool) -> Result<IngestReport> {
    let data_dir = &config.paths.data_dir;
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;
    }

    let loaded = loaders::load_directory(data_dir, &config.database).await;
    let mut report = IngestReport {
        files: loaded.loaded,
        failures: loaded.failures,
        ignored: loaded.ignored,
        records: loaded.records.len(),
        warning: loaded.warning,
        ..Default::default()
    };
    if loaded.records.is_empty() {
        if fresh {
            store::release_shared_store(&config.paths.store_dir).await;
            if let Some(store) = VectorStore::open_existing(&config.paths.store_dir).await? {
                report.cleared = store.replace(&[], &[], "").await?;
                store.close().await;
            }
        }
        return Ok(report);
    }

    let chunker = Chunker::from_config(&config.chunking)?;
    let chunks = chunker.chunk_records(&loaded.records);
    report.chunks = chunks.len();

    let provider = embedding::create_provider(&config.embedding)?;
    let batch_size = config.embedding.batch_size.max(1);

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let batch_vectors = embedding::embed_texts(&config.embedding, &texts)
            .await
            .context("Failed to embed chunks")?;
        vectors.extend(batch_vectors);
    }

    store::release_shared_store(&config.paths.store_dir).await;

    let store = VectorStore::open(&config.paths.store_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to open vector store: {}",
                config.paths.store_dir.display()
            )
        })?;
    let written = if fresh {
        store
            .replace(&chunks, &vectors, provider.model_name())
            .await
            .map(|cleared| report.cleared = cleared)
    } else {
        store.add(&chunks, &vectors, provider.model_name()).await.map(|_| ())
    };
    store.close().await;
    written.context("Failed to write vector store")?;
    report.stored = chunks.len();

    tracing::info!(
        records = report.records,
        chunks = report.chunks,
        stored = report.stored,
        model = provider.model_name(),
        "ingestion complete"
    );
    Ok(report)
}

/// `docqa ingest`: run the pipeline and print a summary.
pub async fn run_ingest(config: &Config, fresh: bool) -> Result<()> {
    let report = ingest_directory(config, fresh).await?;

    println!("ingest {}", config.paths.data_dir.display());
    for (file, records) in &report.files {
        println!("  loaded: {} ({} record{})", file, records, plural(*records));
    }
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.file, failure.error);
    }
    if report.ignored > 0 {
        println!("  ignored: {} unsupported file{}", report.ignored, plural(report.ignored));
    }

    if report.is_empty() {
        println!("No documents found to ingest!");
        return Ok(());
    }

    println!("  records: {}", report.records);
    println!("  chunks: {}", report.chunks);
    if fresh {
        println!("  cleared entries: {}", report.cleared);
    }
    println!("  stored entries: {}", report.stored);
    println!("  store: {}", config.paths.store_dir.display());
    println!("ok");
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
