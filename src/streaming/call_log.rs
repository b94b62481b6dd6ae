//! NDJSON log of prompts sent and responses received
//!
//! Optional audit trail: one JSON object per line, tagged with the caller's
//! correlation id. Write failures are reported and otherwise ignored.

use crate::models::ModelId;
use crate::types::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallLogKind {
    MessagesSent,
    SuccessfulResponse,
}

#[derive(Debug, Serialize)]
pub struct CallLogEntry<'a> {
    pub correlation_id: Option<&'a str>,
    pub kind: CallLogKind,
    pub model: ModelId,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<&'a str>,
    pub token_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Append-only NDJSON writer shared by clones
#[derive(Debug, Clone)]
pub struct CallLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CallLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry; failures are logged, never returned
    pub fn append(&self, entry: &CallLogEntry<'_>) {
        if let Err(e) = self.try_append(entry) {
            warn!(path = %self.path.display(), error = %e, "failed to append call log entry");
        }
    }

    fn try_append(&self, entry: &CallLogEntry<'_>) -> anyhow::Result<()> {
        let line = serde_json::to_string(entry)?;

        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("call log lock poisoned"))?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = CallLog::new(dir.path().join("calls.ndjson"));
        let messages = vec![Message::user("hello")];

        log.append(&CallLogEntry {
            correlation_id: Some("case-1"),
            kind: CallLogKind::MessagesSent,
            model: ModelId::Gpt35Turbo,
            messages: &messages,
            response: None,
            token_count: 2,
            timestamp: Utc::now(),
        });
        log.append(&CallLogEntry {
            correlation_id: Some("case-1"),
            kind: CallLogKind::SuccessfulResponse,
            model: ModelId::Gpt35Turbo,
            messages: &messages,
            response: Some("hi there"),
            token_count: 2,
            timestamp: Utc::now(),
        });

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "messages_sent");
        assert!(lines[0].get("response").is_none());
        assert_eq!(lines[1]["response"], "hi there");
        assert_eq!(lines[1]["model"], "gpt-3.5-turbo");
    }

    #[test]
    fn test_unwritable_path_is_not_fatal() {
        let log = CallLog::new("/nonexistent-dir/calls.ndjson");
        let messages = vec![];

        log.append(&CallLogEntry {
            correlation_id: None,
            kind: CallLogKind::MessagesSent,
            model: ModelId::Gpt4,
            messages: &messages,
            response: None,
            token_count: 0,
            timestamp: Utc::now(),
        });
    }
}
