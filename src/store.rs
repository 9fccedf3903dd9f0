//! Persistent vector index.
//!
//! Entries live in a SQLite file (`index.sqlite`) inside the store
//! directory: chunk text, metadata as JSON, and the embedding as a
//! little-endian `f32` BLOB. Search is brute-force cosine similarity over
//! every stored vector, computed in Rust at query time.
//!
//! A process-wide handle is cached by [`shared_store`] so repeated queries
//! reuse one connection pool; [`delete_store`] drops that handle before
//! removing the directory.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::{Chunk, Metadata, SearchHit};
use crate::{db, migrate};

/// File name of the index database inside the store directory.
pub const INDEX_FILE: &str = "index.sqlite";

#[derive(Clone)]
pub struct VectorStore {
    pool: SqlitePool,
    dir: PathBuf,
}

impl VectorStore {
    /// Open the store in `dir`, creating the directory and schema if needed.
    pub async fn open(dir: &Path) -> Result<Self> {
        let pool = db::connect(&dir.join(INDEX_FILE)).await?;
        migrate::run_migrations(&pool).await?;
        debug!(dir = %dir.display(), "vector store opened");
        Ok(Self {
            pool,
            dir: dir.to_path_buf(),
        })
    }

    /// Open the store only if it was created before; `None` otherwise.
    pub async fn open_existing(dir: &Path) -> Result<Option<Self>> {
        if !dir.join(INDEX_FILE).is_file() {
            return Ok(None);
        }
        Self::open(dir).await.map(Some)
    }

    /// Persist chunks with their vectors in one transaction.
    ///
    /// Fails without writing anything if the counts differ or a vector's
    /// width does not match the vectors already stored.
    pub async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<usize> {
        let expected = self.dims().await?;
        check_vectors(chunks, vectors, expected)?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        insert_entries(&mut tx, chunks, vectors, model).await?;
        tx.commit().await?;

        info!(entries = chunks.len(), "added to vector store");
        Ok(chunks.len())
    }

    /// Replace every entry with `chunks` in one transaction. Returns the
    /// number of entries removed; on failure the previous entries remain.
    pub async fn replace(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<u64> {
        check_vectors(chunks, vectors, None)?;

        let mut tx = self.pool.begin().await?;
        let cleared = sqlx::query("DELETE FROM entries")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        insert_entries(&mut tx, chunks, vectors, model).await?;
        tx.commit().await?;

        info!(cleared, entries = chunks.len(), "vector store replaced");
        Ok(cleared)
    }

    /// The `k` entries most similar to `query`, best first. Equal scores
    /// keep insertion order.
    ///
    /// A query whose width differs from the stored vectors is an error:
    /// it means the embedding model changed since ingestion.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dims) = self.dims().await? {
            if dims != query.len() {
                return Err(Error::Embedding(format!(
                    "vector dimension mismatch: index holds {}, query has {}; re-ingest with the current embedding model",
                    dims,
                    query.len()
                )));
            }
        }
        let rows = sqlx::query(
            "SELECT id, text, metadata_json, embedding FROM entries ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.try_get("embedding")?;
            let metadata_json: String = row.try_get("metadata_json")?;
            let metadata: Metadata = serde_json::from_str(&metadata_json)
                .map_err(|e| Error::Connection(format!("corrupt entry metadata: {}", e)))?;
            hits.push(SearchHit {
                id: row.try_get("id")?,
                text: row.try_get("text")?,
                metadata,
                score: cosine_similarity(query, &blob_to_vec(&blob)),
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Entry counts per source file, by source name.
    pub async fn source_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT source, COUNT(*) FROM entries GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(s, n)| (s.unwrap_or_default(), n))
            .collect())
    }

    async fn dims(&self) -> Result<Option<usize>> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM entries LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(dims.map(|d| d as usize))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Counts must match and every vector must share one width (`expected`
/// when the index already holds vectors).
fn check_vectors(chunks: &[Chunk], vectors: &[Vec<f32>], expected: Option<usize>) -> Result<()> {
    if chunks.len() != vectors.len() {
        return Err(Error::Embedding(format!(
            "{} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )));
    }
    let Some(expected) = expected.or_else(|| vectors.first().map(Vec::len)) else {
        return Ok(());
    };
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(Error::Embedding(format!(
            "vector dimension mismatch: index holds {}, got {}",
            expected,
            bad.len()
        )));
    }
    Ok(())
}

async fn insert_entries(
    tx: &mut Transaction<'_, Sqlite>,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    model: &str,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    for (chunk, vector) in chunks.iter().zip(vectors) {
        let metadata_json = serde_json::to_string(&chunk.metadata)
            .map_err(|e| Error::Connection(e.to_string()))?;
        let source = chunk.metadata.get("source").and_then(|s| s.as_str());
        sqlx::query(
            "INSERT INTO entries (id, text, metadata_json, source, embedding, dims, model, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(chunk.text.as_str())
        .bind(metadata_json)
        .bind(source)
        .bind(vec_to_blob(vector))
        .bind(vector.len() as i64)
        .bind(model)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn shared_slot() -> &'static Mutex<Option<VectorStore>> {
    static SHARED: OnceLock<Mutex<Option<VectorStore>>> = OnceLock::new();
    SHARED.get_or_init(|| Mutex::new(None))
}

/// The cached store for `dir`, opened on first use. `None` when no index
/// exists there yet.
pub async fn shared_store(dir: &Path) -> Result<Option<VectorStore>> {
    let mut slot = shared_slot().lock().await;
    if let Some(store) = slot.as_ref() {
        if store.dir == dir && store.dir.join(INDEX_FILE).is_file() {
            return Ok(Some(store.clone()));
        }
    }
    let store = VectorStore::open_existing(dir).await?;
    *slot = store.clone();
    Ok(store)
}

/// Drop the cached store handle, closing its connections.
pub async fn reset_shared_store() {
    let mut slot = shared_slot().lock().await;
    if let Some(store) = slot.take() {
        store.close().await;
    }
}

/// Drop the cached handle if it belongs to `dir`. Handles for other
/// directories are left open.
pub async fn release_shared_store(dir: &Path) {
    let mut slot = shared_slot().lock().await;
    if slot.as_ref().is_some_and(|s| s.dir == dir) {
        if let Some(store) = slot.take() {
            store.close().await;
        }
    }
}

/// Irrecoverably delete the store directory. Returns `false` if there was
/// nothing to delete.
pub async fn delete_store(dir: &Path) -> Result<bool> {
    release_shared_store(dir).await;
    if !dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(dir)?;
    info!(dir = %dir.display(), "vector store deleted");
    Ok(true)
}
