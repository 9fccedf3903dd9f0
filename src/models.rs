//! Core data models used throughout docqa.
//!
//! These types represent the records, chunks, and search hits that flow
//! through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Insertion-ordered metadata attached to records and chunks.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Text extracted by a format adapter from one file, or from one unit of it
/// (a PDF page, a slide, a database table).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub content: String,
    pub metadata: Metadata,
}

impl RawRecord {
    /// Create a record tagged with the mandatory `source` and `type` keys.
    pub fn new(content: impl Into<String>, source: &str, kind: &str) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), source.into());
        metadata.insert("type".to_string(), kind.into());
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Add a format-specific metadata field.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }

    pub fn kind(&self) -> Option<&str> {
        self.metadata.get("type").and_then(|v| v.as_str())
    }
}

/// A bounded window of a record's text, carrying the record's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
}

/// A stored chunk returned by vector search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

impl SearchHit {
    /// Cosine distance (`1 - similarity`); smaller is closer.
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

/// One question/answer turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}
