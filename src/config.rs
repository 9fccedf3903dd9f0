//! TOML configuration.
//!
//! Every section has defaults, so a missing config file yields a working
//! setup (`data/` ingestion root, `vector_store/` index, local embeddings,
//! Gemini generation). See `config/docqa.example.toml` for all keys.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory scanned by `ingest`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding the persisted vector index.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_dir: default_store_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_store_dir() -> PathBuf {
    PathBuf::from("vector_store")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of previous exchanges injected into multi-turn prompts.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_turns: default_history_turns(),
        }
    }
}

fn default_top_k() -> usize {
    4
}
fn default_history_turns() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL of the Ollama server (ollama provider only).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
        }
    }
}

fn default_llm_provider() -> String {
    "gemini".to_string()
}
fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_llm_max_retries() -> u32 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Row limit for a single-table load.
    #[serde(default = "default_table_row_limit")]
    pub table_row_limit: usize,
    /// Per-table row limit when a whole database file is ingested.
    #[serde(default = "default_all_tables_row_limit")]
    pub all_tables_row_limit: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            table_row_limit: default_table_row_limit(),
            all_tables_row_limit: default_all_tables_row_limit(),
        }
    }
}

fn default_table_row_limit() -> usize {
    100
}
fn default_all_tables_row_limit() -> usize {
    50
}

impl Config {
    /// Location of the SQLite file inside the store directory.
    pub fn index_path(&self) -> PathBuf {
        self.paths.store_dir.join(crate::store::INDEX_FILE)
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists; otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" | "ollama" | "hash" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, ollama, or hash.",
            other
        ),
    }
    if config.embedding.provider == "ollama" && config.embedding.model.is_none() {
        bail!("embedding.model must be specified when provider is 'ollama'");
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    match config.llm.provider.as_str() {
        "disabled" | "gemini" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    if config.paths.data_dir == config.paths.store_dir {
        bail!("paths.data_dir and paths.store_dir must be different directories");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.history_turns, 3);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.database.table_row_limit, 100);
        assert_eq!(config.database.all_tables_row_limit, 50);
        assert_eq!(config.index_path(), PathBuf::from("vector_store/index.sqlite"));
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            data_dir = "docs"

            [embedding]
            provider = "hash"
            dims = 64
            "#,
        )
        .unwrap();
        validate(&config).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("docs"));
        assert_eq!(config.paths.store_dir, PathBuf::from("vector_store"));
        assert_eq!(config.embedding.dims, Some(64));
        assert_eq!(config.embedding.batch_size, 64);
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 100
            chunk_overlap = 100
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_providers_rejected() {
        let config: Config = toml::from_str("[embedding]\nprovider = \"word2vec\"\n").unwrap();
        assert!(validate(&config).is_err());

        let config: Config = toml::from_str("[llm]\nprovider = \"gpt\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("/nonexistent/docqa.toml")).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
    }
}
