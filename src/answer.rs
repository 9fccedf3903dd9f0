//! Query-time pipeline: retrieve, compose context, prompt, generate, and
//! fall back to extraction when generation fails.
//!
//! [`answer_question`] never returns an error. Every outcome, including
//! a missing store or a failed embedding call, is rendered as text and
//! tagged with an [`AnswerKind`].

use tracing::{info, warn};

use crate::config::Config;
use crate::conversation::Conversation;
use crate::embedding;
use crate::error::{Error, ModelFailure, Result};
use crate::fallback;
use crate::llm::AnswerModel;
use crate::models::SearchHit;
use crate::prompt;
use crate::store;

pub const STORE_UNAVAILABLE: &str =
    "Error: Vector store not available. Please ingest documents first.";
pub const NO_CONTEXT: &str = "No relevant documents found for this query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Text produced by the generative model.
    Generated,
    /// Generation failed; sentences were extracted from the context.
    Fallback,
    /// Generation failed and nothing could be extracted.
    ModelError,
    /// No index exists (or it could not be opened).
    StoreUnavailable,
    /// Retrieval returned no usable context.
    NoContext,
    /// Embedding or search failed.
    Failed,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
    /// Distinct `source` values of the retrieved chunks, in rank order.
    pub sources: Vec<String>,
}

impl Answer {
    fn bare(text: impl Into<String>, kind: AnswerKind) -> Self {
        Self {
            text: text.into(),
            kind,
            sources: Vec::new(),
        }
    }
}

/// Answer one question against the persisted store.
///
/// With a `conversation`, the prompt includes its recent exchanges and the
/// new exchange is appended for generated, fallback, and model-error
/// outcomes. Without one, the single-turn prompt is used.
pub async fn answer_question(
    config: &Config,
    model: &dyn AnswerModel,
    question: &str,
    conversation: Option<&mut Conversation>,
) -> Answer {
    let store = match store::shared_store(&config.paths.store_dir).await {
        Ok(Some(store)) => store,
        Ok(None) => return Answer::bare(STORE_UNAVAILABLE, AnswerKind::StoreUnavailable),
        Err(e) => {
            warn!(error = %e, "failed to open vector store");
            return Answer::bare(STORE_UNAVAILABLE, AnswerKind::StoreUnavailable);
        }
    };

    let hits = match retrieve(config, &store, question).await {
        Ok(hits) => hits,
        Err(e) => return Answer::bare(format!("Query failed: {}", e), AnswerKind::Failed),
    };

    let context = prompt::build_context(&hits);
    if context.trim().is_empty() {
        return Answer::bare(NO_CONTEXT, AnswerKind::NoContext);
    }
    let sources = distinct_sources(&hits);

    let prompt_text = match conversation.as_deref() {
        Some(conv) => prompt::conversational_prompt(
            question,
            &context,
            conv.recent(config.retrieval.history_turns),
        ),
        None => prompt::grounded_prompt(question, &context),
    };

    let (text, kind) = match model.generate(&prompt_text).await {
        Ok(text) => {
            info!(model = model.name(), chunks = hits.len(), "answer generated");
            (text, AnswerKind::Generated)
        }
        Err(e) => {
            let failure = match &e {
                Error::Model { kind, .. } => *kind,
                _ => ModelFailure::InvalidResponse,
            };
            warn!(error = %e, "generation failed, using extractive fallback");
            let (text, extracted) = fallback::fallback_answer(&context, question, failure);
            let kind = if extracted {
                AnswerKind::Fallback
            } else {
                AnswerKind::ModelError
            };
            (text, kind)
        }
    };

    if let Some(conv) = conversation {
        conv.push(question, text.as_str());
    }

    Answer {
        text,
        kind,
        sources,
    }
}

async fn retrieve(config: &Config, store: &store::VectorStore, question: &str) -> Result<Vec<SearchHit>> {
    let query = embedding::embed_query(&config.embedding, question).await?;
    store.search(&query, config.retrieval.top_k).await
}

fn distinct_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for hit in hits {
        if let Some(source) = hit.metadata.get("source").and_then(|s| s.as_str()) {
            if !out.iter().any(|s| s == source) {
                out.push(source.to_string());
            }
        }
    }
    out
}
