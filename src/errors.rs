//! Error types for Roundtable
//!
//! Stream-level failures are not errors here: they travel as
//! `StreamEvent::Error` values so one misbehaving agent cannot halt a round.
//! This enum covers everything else (configuration, wiring, scheduling).

use thiserror::Error;

/// Main error type for the debate engine
#[derive(Error, Debug)]
pub enum DebateError {
    /// Round state machine transition errors
    #[error("Invalid round transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Nobody is left to speak after anti-repetition filtering
    #[error("No eligible speaker in round {round}: roster too small for the anti-repetition rule")]
    NoEligibleSpeaker { round: usize },

    /// Agent id missing from the persona registry
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Malformed inbound stream records
    #[error("Stream parse error: {0}")]
    StreamParseError(String),

    /// Tokenizer loading errors
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type alias for debate operations
pub type Result<T> = std::result::Result<T, DebateError>;
