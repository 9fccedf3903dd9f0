//! Grounding prompts for answer generation.

use crate::models::{Exchange, SearchHit};

/// Phrase the model is told to use when the context has no answer.
pub const NOT_FOUND: &str = "Not found in documents";

/// Join retrieved chunk texts, in search order, with blank lines.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render previous exchanges as a `Previous conversation:` block, or an
/// empty string when there are none.
pub fn render_history(exchanges: &[Exchange]) -> String {
    if exchanges.is_empty() {
        return String::new();
    }
    let mut out = String::from("Previous conversation:\n");
    for exchange in exchanges {
        out.push_str(&format!(
            "User: {}\nAssistant: {}\n\n",
            exchange.question, exchange.answer
        ));
    }
    out
}

/// Single-turn prompt: context and question only.
pub fn grounded_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are an academic assistant.
Answer ONLY using the context below.
If the answer is not present, say "{NOT_FOUND}".

Context:
{context}

Question:
{question}
"#
    )
}

/// Multi-turn prompt that also carries recent exchanges.
pub fn conversational_prompt(question: &str, context: &str, history: &[Exchange]) -> String {
    let history_text = render_history(history);
    format!(
        r#"You are an academic assistant with access to specific documents.
Answer ONLY using the context below and previous conversation if provided.
If the answer is not present, say "{NOT_FOUND}".
Be conversational and maintain context from previous exchanges.

{history_text}

Context from documents:
{context}

Question:
{question}
"#
    )
}
