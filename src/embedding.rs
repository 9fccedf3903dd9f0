//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when embeddings are not configured.
//! - **[`LocalProvider`]** — runs a sentence-embedding model locally via fastembed;
//!   no network calls after the first model download.
//! - **[`OllamaProvider`]** — calls an Ollama instance's `/api/embed` endpoint.
//! - **[`HashProvider`]** — deterministic feature hashing; offline and model-free.
//!
//! Also provides vector utilities used by the store:
//! - [`cosine_similarity`] — the similarity metric applied at search time
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for SQLite BLOB storage
//! - [`blob_to_vec`] — decode a SQLite BLOB back into a `Vec<f32>`
//!
//! # Model cache
//!
//! The local model is loaded once per process and shared through a
//! lock-guarded slot. [`reset_embedding_cache`] drops it so the next call
//! reloads (tests use this to start from a clean state).
//!
//! # Retry Strategy
//!
//! The Ollama provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Default model for the `local` provider.
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";
/// Vector width of the `hash` provider when `embedding.dims` is unset.
pub const DEFAULT_HASH_DIMS: usize = 256;

/// Interface shared by all embedding backends.
///
/// The embedding computation itself is [`embed_texts`], dispatched on the
/// configured provider name.
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier recorded next to each stored vector.
    fn model_name(&self) -> &str;
    /// Vector dimensionality.
    fn dims(&self) -> usize;
}

/// Embed a batch of texts, returning one vector per text in input order.
pub async fn embed_texts(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let vectors = match config.provider.as_str() {
        "local" => embed_local(config, texts).await?,
        "ollama" => embed_ollama(config, texts).await?,
        "hash" => embed_hash(texts, config.dims.unwrap_or(DEFAULT_HASH_DIMS)),
        "disabled" => return Err(Error::Embedding("embedding provider is disabled".into())),
        other => {
            return Err(Error::Embedding(format!(
                "unknown embedding provider: {}",
                other
            )))
        }
    };

    if vectors.len() != texts.len() {
        return Err(Error::Embedding(format!(
            "provider returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    Ok(vectors)
}

/// Embed a single query text.
pub async fn embed_query(config: &EmbeddingConfig, text: &str) -> Result<Vec<f32>> {
    embed_texts(config, &[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("empty embedding response".into()))
}

// ============ Disabled Provider ============

/// A no-op embedding provider; any attempt to embed fails.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
}

// ============ Hash Provider ============

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token adds ±1 to one bucket chosen by its
/// SHA-256 digest. Texts sharing words get similar vectors, which is enough
/// for retrieval in tests and air-gapped setups.
pub struct HashProvider {
    dims: usize,
}

impl HashProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            dims: config.dims.unwrap_or(DEFAULT_HASH_DIMS),
        }
    }
}

impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

fn embed_hash(texts: &[String], dims: usize) -> Vec<Vec<f32>> {
    texts.iter().map(|t| hash_vector(t, dims)).collect()
}

fn hash_vector(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims];
    if dims == 0 {
        return v;
    }
    let lower = text.to_lowercase();
    for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(head) % dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
    v
}

// ============ Ollama Provider ============

/// Embedding provider using an Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Config("embedding.model required for Ollama provider".into()))?;
        let dims = config
            .dims
            .ok_or_else(|| Error::Config("embedding.dims required for Ollama provider".into()))?;
        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_ollama(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| Error::Config("embedding.model required".into()))?;

    let url = config.url.as_deref().unwrap_or("http://localhost:11434");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Embedding(e.to_string()))?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/api/embed", url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| Error::Embedding(e.to_string()))?;
                    return parse_ollama_response(&json);
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = Error::Embedding(format!("Ollama API error {}: {}", status, body_text));
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(attempt, %status, "ollama embedding failed, retrying");
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(Error::Embedding(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    url, e
                )));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Embedding("Ollama embedding failed after retries".into())))
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let invalid = |what: &str| Error::Embedding(format!("Invalid Ollama response: {}", what));
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| invalid("embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }
    Ok(result)
}

// ============ Local Provider (fastembed) ============

/// Local sentence-embedding model.
///
/// Downloaded from Hugging Face on first use and cached on disk; after
/// that embeddings run entirely offline.
pub struct LocalProvider {
    model_name: String,
    dims: usize,
}

impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        Ok(Self { model_name, dims })
    }
}

impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "all-minilm-l6-v2" => 384,
        "bge-small-en-v1.5" => 384,
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "multilingual-e5-small" => 384,
        _ => 384,
    });

    (model_name, dims)
}

/// Name-keyed, lazily loaded model slot.
///
/// Holds at most one model. Asking for a different name replaces it.
#[cfg_attr(not(feature = "local-embeddings-fastembed"), allow(dead_code))]
struct ModelCache<T> {
    slot: Mutex<Option<(String, Arc<Mutex<T>>)>>,
}

#[cfg_attr(not(feature = "local-embeddings-fastembed"), allow(dead_code))]
impl<T> ModelCache<T> {
    const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the cached model for `name`, calling `load` when the slot is
    /// empty or holds another model. A failed load leaves the slot as it was.
    fn get_or_load(&self, name: &str, load: impl FnOnce() -> Result<T>) -> Result<Arc<Mutex<T>>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::Embedding("embedding model lock poisoned".into()))?;
        if let Some((loaded, model)) = slot.as_ref() {
            if loaded == name {
                return Ok(model.clone());
            }
        }
        let model = Arc::new(Mutex::new(load()?));
        *slot = Some((name.to_string(), model.clone()));
        Ok(model)
    }

    /// Drop the cached model, clearing a poisoned lock as well.
    fn reset(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        drop(slot);
        self.slot.clear_poison();
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
mod local {
    use crate::error::{Error, Result};

    use super::ModelCache;

    static LOCAL_MODEL: ModelCache<fastembed::TextEmbedding> = ModelCache::new();

    fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
            other => Err(Error::Config(format!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 multilingual-e5-small",
                other
            ))),
        }
    }

    fn load(name: &str) -> Result<fastembed::TextEmbedding> {
        tracing::info!(model = name, "loading local embedding model");
        fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(to_fastembed_model(name)?)
                .with_show_download_progress(false),
        )
        .map_err(|e| Error::Embedding(format!("Failed to initialize local embedding model: {}", e)))
    }

    pub fn embed_blocking(name: &str, texts: Vec<String>, batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let model = LOCAL_MODEL.get_or_load(name, || load(name))?;
        let mut model = model
            .lock()
            .map_err(|_| Error::Embedding("embedding model lock poisoned".into()))?;
        model
            .embed(texts, Some(batch_size))
            .map_err(|e| Error::Embedding(format!("Local embedding failed: {}", e)))
    }

    pub fn reset() {
        LOCAL_MODEL.reset();
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
async fn embed_local(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let (model_name, _) = resolve_local_model(config);
    let batch_size = config.batch_size;
    let texts = texts.to_vec();

    tokio::task::spawn_blocking(move || local::embed_blocking(&model_name, texts, batch_size))
        .await
        .map_err(|e| Error::Embedding(format!("embedding worker aborted: {}", e)))?
}

#[cfg(not(feature = "local-embeddings-fastembed"))]
async fn embed_local(_config: &EmbeddingConfig, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Err(Error::Config(
        "Local embedding provider requires --features local-embeddings-fastembed".into(),
    ))
}

/// Drop the cached local model; the next embedding call reloads it.
pub fn reset_embedding_cache() {
    #[cfg(feature = "local-embeddings-fastembed")]
    local::reset();
}

/// Create the [`EmbeddingProvider`] named by the configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"local"` | [`LocalProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"hash"` | [`HashProvider`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        "hash" => Ok(Box::new(HashProvider::new(config))),
        other => Err(Error::Config(format!("Unknown embedding provider: {}", other))),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two vectors, in `[-1.0, 1.0]`.
///
/// Vectors are not assumed to be normalized. Returns `0.0` for empty
/// vectors, vectors of different lengths, or a zero vector.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn model_cache_reloads_after_reset() {
        let cache = ModelCache::<usize>::new();
        let mut loads = 0;

        let first = cache.get_or_load("a", || { loads += 1; Ok(loads) }).unwrap();
        let again = cache.get_or_load("a", || { loads += 1; Ok(loads) }).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(loads, 1);

        cache.reset();
        let reloaded = cache.get_or_load("a", || { loads += 1; Ok(loads) }).unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(*reloaded.lock().unwrap(), 2);

        // a different name replaces the cached model
        let other = cache.get_or_load("b", || { loads += 1; Ok(loads) }).unwrap();
        assert_eq!(*other.lock().unwrap(), 3);
    }

    #[test]
    fn failed_load_keeps_cached_model() {
        let cache = ModelCache::<&str>::new();
        cache.get_or_load("a", || Ok("model-a")).unwrap();
        let err = cache
            .get_or_load("b", || Err(Error::Embedding("download failed".into())))
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        let kept = cache.get_or_load("a", || Ok("reloaded")).unwrap();
        assert_eq!(*kept.lock().unwrap(), "model-a");
    }

    #[test]
    fn reset_clears_poisoned_cache() {
        let cache = ModelCache::<u8>::new();
        std::thread::scope(|s| {
            let crashed = s
                .spawn(|| {
                    let _slot = cache.slot.lock().unwrap();
                    panic!("loader crashed");
                })
                .join();
            assert!(crashed.is_err());
        });
        assert!(cache.get_or_load("a", || Ok(1)).is_err());

        cache.reset();
        assert_eq!(*cache.get_or_load("a", || Ok(1)).unwrap().lock().unwrap(), 1);
    }

    #[test]
    fn reset_embedding_cache_on_empty_cache() {
        reset_embedding_cache();
        reset_embedding_cache();
        let provider = create_provider(&hash_config(16)).unwrap();
        assert_eq!(provider.dims(), 16);
    }

    fn hash_config(dims: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "hash".to_string(),
            dims: Some(dims),
            ..Default::default()
        }
    }

    #[test]
    fn vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn cosine_basics() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let a = vec![1.0, 2.0, 3.0];
        let b: Vec<f32> = a.iter().map(|x| x * 10.0).collect();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn hash_embeddings_are_deterministic() {
        let config = hash_config(64);
        let texts = vec!["Asexual reproduction".to_string(), "asexual REPRODUCTION!".to_string()];
        let vectors = embed_texts(&config, &texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 64);
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(embed_query(&config, "Asexual reproduction").await.unwrap(), vectors[0]);
    }

    #[tokio::test]
    async fn hash_similarity_follows_shared_words() {
        let config = hash_config(256);
        let q = embed_query(&config, "what is parthenogenesis").await.unwrap();
        let near = embed_query(&config, "parthenogenesis is asexual reproduction")
            .await
            .unwrap();
        let far = embed_query(&config, "the stock market closed higher")
            .await
            .unwrap();
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[tokio::test]
    async fn disabled_provider_errors() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            embed_query(&config, "x").await.unwrap_err(),
            Error::Embedding(_)
        ));
        assert_eq!(create_provider(&config).unwrap().dims(), 0);
    }

    #[test]
    fn provider_metadata() {
        let local = create_provider(&EmbeddingConfig::default()).unwrap();
        assert_eq!(local.model_name(), "all-minilm-l6-v2");
        assert_eq!(local.dims(), 384);

        let hash = create_provider(&hash_config(32)).unwrap();
        assert_eq!(hash.model_name(), "hash");
        assert_eq!(hash.dims(), 32);

        let ollama = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert!(create_provider(&ollama).is_err());
    }

    #[tokio::test]
    async fn ollama_embeddings_via_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2], [0.3, 0.4]]
            })))
            .mount(&server)
            .await;

        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            dims: Some(2),
            url: Some(server.uri()),
            ..Default::default()
        };
        let texts = vec!["a".to_string(), "b".to_string()];
        let vectors = embed_texts(&config, &texts).await.unwrap();
        assert_eq!(vectors, vec![vec![0.1f32, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn ollama_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .expect(1)
            .mount(&server)
            .await;

        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nope".to_string()),
            dims: Some(2),
            url: Some(server.uri()),
            max_retries: 3,
            ..Default::default()
        };
        let err = embed_query(&config, "x").await.unwrap_err();
        assert!(err.to_string().contains("bad model"));
    }
}
