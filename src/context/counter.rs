//! Token counting for context-window accounting
//!
//! The backend's own tokenizer is a black box; this module approximates it
//! closely enough that the session's safety margin absorbs the drift.
//!
//! # Implementations
//!
//! - [`HeuristicTokenizer`]: 1 token ≈ 4 characters, ceiling division
//! - [`HfTokenizer`]: a `tokenizer.json` BPE model (e.g. GPT-2) via `tokenizers`
//!
//! Both are deterministic, so counts are stable across calls within one run.

use crate::errors::{DebateError, Result};
use crate::types::Message;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Black-box text tokenizer
pub trait Tokenizer: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;
}

/// Character-based token estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl HeuristicTokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Estimate token count for text
    ///
    /// ```text
    /// estimate(text) = ⌈chars(text) / 4⌉
    /// ```
    ///
    /// ```
    /// # use roundtable::context::counter::{HeuristicTokenizer, Tokenizer};
    /// let tokenizer = HeuristicTokenizer::new();
    /// assert_eq!(tokenizer.count(&"a".repeat(100)), 25);
    /// ```
    pub fn estimate(text: &str) -> usize {
        let char_count = text.chars().count();
        (char_count + 3) / 4
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> usize {
        Self::estimate(text)
    }
}

/// Tokenizer backed by a HuggingFace `tokenizer.json`
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    /// Load a serialized tokenizer (e.g. the GPT-2 BPE `tokenizer.json`)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            DebateError::TokenizerError(format!("Failed to load {}: {}", path.display(), e))
        })?;

        Ok(Self { inner })
    }
}

impl Tokenizer for HfTokenizer {
    fn count(&self, text: &str) -> usize {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                warn!(error = %e, "tokenizer encode failed, falling back to heuristic");
                HeuristicTokenizer::estimate(text)
            }
        }
    }
}

/// Counts tokens of role-tagged message sequences
#[derive(Clone)]
pub struct TokenCounter {
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenCounter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Counter using the character heuristic
    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicTokenizer::new()))
    }

    /// Token count of a single text
    pub fn count_text(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    /// Token count of a message sequence
    ///
    /// Contents are joined with newlines; role tags are not counted.
    pub fn count_messages(&self, messages: &[Message]) -> usize {
        let joined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        self.tokenizer.count(&joined)
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::heuristic()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_estimation() {
        let text = "a".repeat(100);
        assert_eq!(HeuristicTokenizer.count(&text), 25);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(HeuristicTokenizer.count(""), 0);
    }

    #[test]
    fn test_single_character() {
        // ceiling division
        assert_eq!(HeuristicTokenizer.count("a"), 1);
    }

    #[test]
    fn test_unicode_characters() {
        // 3 chars / 4 = 0.75 → 1
        assert_eq!(HeuristicTokenizer.count("日本語"), 1);
    }

    #[test]
    fn test_count_messages_joins_with_newlines() {
        let counter = TokenCounter::heuristic();
        let messages = vec![Message::system("a".repeat(7)), Message::user("b".repeat(8))];

        // 7 + 1 newline + 8 = 16 chars
        assert_eq!(counter.count_messages(&messages), 4);
    }

    #[test]
    fn test_count_messages_empty() {
        let counter = TokenCounter::heuristic();
        assert_eq!(counter.count_messages(&[]), 0);
    }

    #[test]
    fn test_custom_tokenizer() {
        struct Words;
        impl Tokenizer for Words {
            fn count(&self, text: &str) -> usize {
                text.split_whitespace().count()
            }
        }

        let counter = TokenCounter::new(Arc::new(Words));
        let messages = vec![Message::user("one two"), Message::assistant("three")];
        assert_eq!(counter.count_messages(&messages), 3);
        assert_eq!(counter.count_text("a b c d"), 4);
    }

    #[test]
    fn test_missing_tokenizer_file() {
        let result = HfTokenizer::from_file("/nonexistent/tokenizer.json");
        assert!(matches!(result, Err(DebateError::TokenizerError(_))));
    }
}
