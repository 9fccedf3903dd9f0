//! Extractive answers for when the generative model is unavailable.
//!
//! Picks up to three context sentences that mention a question keyword.
//! The thresholds below are part of the user-visible contract.

use crate::error::ModelFailure;

pub const FALLBACK_PREFIX: &str = "[Fallback - Extracted from documents]";

/// Question words must be longer than this (in characters) to count.
const MIN_KEYWORD_LEN: usize = 3;
/// Sentences must be longer than this to be kept; shorter ones are
/// usually headings.
const MIN_SENTENCE_LEN: usize = 20;
const MAX_SENTENCES: usize = 3;

/// Sentence openers that mark an instruction or heading, not an answer.
const IMPERATIVE_OPENERS: &[&str] = &[
    "write", "explain", "define", "describe", "discuss", "list", "state", "mention", "give",
    "what", "how", "when", "where", "why",
];

/// Sentences of `context` relevant to `question`, joined with spaces.
/// `None` when nothing qualifies.
pub fn extract_answer(context: &str, question: &str) -> Option<String> {
    let keywords = keywords(question);
    if keywords.is_empty() {
        return None;
    }
    let question_lower = question.trim().to_lowercase();

    let flattened = context.replace('\n', " ");
    let mut picked: Vec<&str> = Vec::new();

    for sentence in flattened.split('.').map(str::trim).filter(|s| !s.is_empty()) {
        let lower = sentence.to_lowercase();
        let relevant = keywords.iter().any(|k| lower.contains(k.as_str()))
            && sentence.chars().count() > MIN_SENTENCE_LEN
            && lower != question_lower
            && !IMPERATIVE_OPENERS.iter().any(|verb| lower.starts_with(verb));
        if relevant && !picked.contains(&sentence) {
            picked.push(sentence);
            if picked.len() == MAX_SENTENCES {
                break;
            }
        }
    }

    if picked.is_empty() {
        None
    } else {
        Some(picked.join(" "))
    }
}

/// The full fallback reply for a failed generation.
pub fn fallback_answer(context: &str, question: &str, failure: ModelFailure) -> (String, bool) {
    match extract_answer(context, question) {
        Some(extract) => (format!("{}\n\n{}", FALLBACK_PREFIX, extract), true),
        None => (
            format!(
                "[LLM Error - {}] Extracted content not available. Please check your API quota.",
                failure
            ),
            false,
        ),
    }
}

/// Lowercased question words with surrounding punctuation removed.
fn keywords(question: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in question.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() > MIN_KEYWORD_LEN && !out.contains(&word) {
            out.push(word);
        }
    }
    out
}
