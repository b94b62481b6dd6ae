//! Context management module
//!
//! Handles token counting and fitting conversations into a token ceiling.

pub mod counter;
pub mod fitter;

// Re-export commonly used types
pub use counter::{HeuristicTokenizer, HfTokenizer, TokenCounter, Tokenizer};
pub use fitter::fit_messages;
