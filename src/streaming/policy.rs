//! Backend fault classification
//!
//! Maps raw backend faults onto the stream error taxonomy through an explicit
//! table that callers may override.
//!
//! HTTP 429 is ambiguous: the backend uses it both for transient throttling
//! and for exhausted account quota, and the status alone cannot tell them
//! apart. The default maps it to `RATE_LIMIT`; deployments that know better
//! can remap it with [`ErrorPolicy::with_status`].

use crate::streaming::events::StreamErrorKind;
use std::collections::HashMap;
use std::fmt;

/// Raw failure reported by a chat backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFault {
    /// Non-success HTTP status when opening the stream
    Status { status: u16, body: String },

    /// Error object delivered inside the stream
    Api { kind: Option<String>, message: String },

    /// Connection-level failure
    Transport(String),

    /// Malformed or unexpected stream content
    Protocol(String),

    /// The backend observed the caller's cancellation
    Cancelled,
}

impl fmt::Display for BackendFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFault::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            BackendFault::Api { kind, message } => {
                write!(f, "API error ({}): {}", kind.as_deref().unwrap_or("unspecified"), message)
            }
            BackendFault::Transport(msg) => write!(f, "transport error: {}", msg),
            BackendFault::Protocol(msg) => write!(f, "protocol error: {}", msg),
            BackendFault::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Overridable fault → error-kind table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPolicy {
    by_status: HashMap<u16, StreamErrorKind>,
    by_error_type: HashMap<String, StreamErrorKind>,
}

impl ErrorPolicy {
    /// Policy with no mappings: everything but cancellation is `UNKNOWN`
    /// (unmapped 5xx statuses still count as backend faults)
    pub fn empty() -> Self {
        Self {
            by_status: HashMap::new(),
            by_error_type: HashMap::new(),
        }
    }

    pub fn with_status(mut self, status: u16, kind: StreamErrorKind) -> Self {
        self.by_status.insert(status, kind);
        self
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>, kind: StreamErrorKind) -> Self {
        self.by_error_type.insert(error_type.into(), kind);
        self
    }

    pub fn classify(&self, fault: &BackendFault) -> StreamErrorKind {
        match fault {
            BackendFault::Status { status, .. } => match self.by_status.get(status) {
                Some(kind) => *kind,
                None if (500..600).contains(status) => StreamErrorKind::OpenAiScrewup,
                None => StreamErrorKind::Unknown,
            },
            BackendFault::Api { kind: Some(error_type), .. } => self
                .by_error_type
                .get(error_type)
                .copied()
                .unwrap_or(StreamErrorKind::Unknown),
            BackendFault::Api { kind: None, .. } => StreamErrorKind::Unknown,
            BackendFault::Transport(_) | BackendFault::Protocol(_) => StreamErrorKind::Unknown,
            BackendFault::Cancelled => StreamErrorKind::ManualAbort,
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::empty()
            .with_status(401, StreamErrorKind::AuthError)
            .with_status(429, StreamErrorKind::RateLimit)
            .with_status(500, StreamErrorKind::OpenAiScrewup)
            .with_status(503, StreamErrorKind::EngineOverloaded)
            .with_error_type("insufficient_quota", StreamErrorKind::QuotaExceeded)
            .with_error_type("server_error", StreamErrorKind::OpenAiScrewup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> BackendFault {
        BackendFault::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_default_status_mapping() {
        let policy = ErrorPolicy::default();

        assert_eq!(policy.classify(&status(401)), StreamErrorKind::AuthError);
        assert_eq!(policy.classify(&status(429)), StreamErrorKind::RateLimit);
        assert_eq!(policy.classify(&status(500)), StreamErrorKind::OpenAiScrewup);
        assert_eq!(policy.classify(&status(502)), StreamErrorKind::OpenAiScrewup);
        assert_eq!(policy.classify(&status(503)), StreamErrorKind::EngineOverloaded);
        assert_eq!(policy.classify(&status(400)), StreamErrorKind::Unknown);
    }

    #[test]
    fn test_in_stream_api_errors() {
        let policy = ErrorPolicy::default();
        let quota = BackendFault::Api {
            kind: Some("insufficient_quota".to_string()),
            message: "You exceeded your current quota".to_string(),
        };
        let untyped = BackendFault::Api {
            kind: None,
            message: "???".to_string(),
        };

        assert_eq!(policy.classify(&quota), StreamErrorKind::QuotaExceeded);
        assert_eq!(policy.classify(&untyped), StreamErrorKind::Unknown);
    }

    #[test]
    fn test_transport_and_cancellation() {
        let policy = ErrorPolicy::default();
        assert_eq!(policy.classify(&BackendFault::Transport("reset".into())), StreamErrorKind::Unknown);
        assert_eq!(policy.classify(&BackendFault::Protocol("bad json".into())), StreamErrorKind::Unknown);
        assert_eq!(policy.classify(&BackendFault::Cancelled), StreamErrorKind::ManualAbort);
    }

    #[test]
    fn test_override_rate_limit() {
        let policy = ErrorPolicy::default().with_status(429, StreamErrorKind::QuotaExceeded);
        assert_eq!(policy.classify(&status(429)), StreamErrorKind::QuotaExceeded);
        assert!(!policy.classify(&status(429)).is_retryable());
    }
}
