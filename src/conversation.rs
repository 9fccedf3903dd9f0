//! Caller-owned conversation history for multi-turn chat.

use crate::models::Exchange;

/// Ordered, append-only list of question/answer exchanges. Lives only as
/// long as the session that owns it.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    exchanges: Vec<Exchange>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.exchanges.push(Exchange {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    /// A copy of every exchange, oldest first.
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.clone()
    }

    /// The last `n` exchanges, oldest first.
    pub fn recent(&self, n: usize) -> &[Exchange] {
        let start = self.exchanges.len().saturating_sub(n);
        &self.exchanges[start..]
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}
