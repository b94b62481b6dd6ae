//! Lifecycle events of one streaming inference call

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified failure kinds of a streaming call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamErrorKind {
    /// Prompt still exceeds the ratio ceiling after trimming (or trimming was disallowed)
    TokenLimit,
    /// Trimming collapsed the prompt to nothing
    LastMessageTooLarge,
    AuthError,
    QuotaExceeded,
    /// Caller-triggered cancellation
    ManualAbort,
    Unknown,
    /// Stream closed before the terminal sentinel
    UnexpectedEnd,
    RateLimit,
    EngineOverloaded,
    /// Backend-side 5xx fault
    #[serde(rename = "OPENAI_SCREWUP")]
    OpenAiScrewup,
}

impl StreamErrorKind {
    /// Whether a caller may reasonably retry the same call
    ///
    /// Classification only; retries are the caller's business.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamErrorKind::UnexpectedEnd
                | StreamErrorKind::RateLimit
                | StreamErrorKind::EngineOverloaded
                | StreamErrorKind::OpenAiScrewup
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamErrorKind::TokenLimit => "TOKEN_LIMIT",
            StreamErrorKind::LastMessageTooLarge => "LAST_MESSAGE_TOO_LARGE",
            StreamErrorKind::AuthError => "AUTH_ERROR",
            StreamErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            StreamErrorKind::ManualAbort => "MANUAL_ABORT",
            StreamErrorKind::Unknown => "UNKNOWN",
            StreamErrorKind::UnexpectedEnd => "UNEXPECTED_END",
            StreamErrorKind::RateLimit => "RATE_LIMIT",
            StreamErrorKind::EngineOverloaded => "ENGINE_OVERLOADED",
            StreamErrorKind::OpenAiScrewup => "OPENAI_SCREWUP",
        }
    }
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a streaming call, with whatever text arrived before it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub partial_message: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, partial_message: impl Into<String>) -> Self {
        Self {
            kind,
            partial_message: partial_message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.partial_message.is_empty() {
            write!(f, " after {} chars", self.partial_message.chars().count())?;
        }
        Ok(())
    }
}

/// One event of a streaming call
///
/// A successful call yields `PromptTokenCount`, any number of `Token`s,
/// `ResponseTokenCount` and finally `CompleteMessage`. A failed call ends
/// with a single `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    PromptTokenCount(usize),
    Token(String),
    ResponseTokenCount(usize),
    CompleteMessage(String),
    Error(StreamError),
}

impl StreamEvent {
    /// Whether this event ends the call
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::CompleteMessage(_) | StreamEvent::Error(_))
    }
}
