//! Incremental record parser for streamed chat completions
//!
//! The backend sends newline-delimited records of the form `data: <payload>`.
//! A network chunk may hold several records, or only part of one, so bytes
//! are buffered until a full line is available.
//!
//! - Buffer: 1MB maximum
//! - Payload `[DONE]` is the terminal sentinel
//! - Other payloads are JSON completion chunks carrying an optional text delta

use crate::errors::{DebateError, Result};
use serde::Deserialize;

/// Maximum buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One complete inbound record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseRecord {
    /// JSON payload of a partial result
    Data(String),

    /// Terminal sentinel
    Done,
}

/// Incremental line parser
#[derive(Debug)]
pub struct RecordParser {
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,

    max_buffer_size: usize,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
        }
    }

    /// Add a chunk and return every record it completed
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseRecord>> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(DebateError::StreamParseError(format!(
                "Buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut records = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(record) = Self::parse_line(&line) {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Flush a trailing record that arrived without a final newline
    pub fn finish(&mut self) -> Option<SseRecord> {
        let line = std::mem::take(&mut self.buffer);
        Self::parse_line(&line)
    }

    fn parse_line(line: &[u8]) -> Option<SseRecord> {
        let text = String::from_utf8_lossy(line);
        let payload = text.trim().strip_prefix(DATA_PREFIX)?.trim();

        if payload == DONE_SENTINEL {
            Some(SseRecord::Done)
        } else if payload.is_empty() {
            None
        } else {
            Some(SseRecord::Data(payload.to_string()))
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed content of a `Data` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkContent {
    /// Text delta, absent for role-only or finish chunks
    Delta(Option<String>),

    /// Error object reported mid-stream
    ApiError { kind: Option<String>, message: String },
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Parse a record payload into its text delta
pub fn parse_chunk(payload: &str) -> Result<ChunkContent> {
    let chunk: CompletionChunk = serde_json::from_str(payload)
        .map_err(|e| DebateError::StreamParseError(format!("Invalid completion chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Ok(ChunkContent::ApiError {
            kind: error.kind,
            message: error
                .message
                .unwrap_or_else(|| "An error occurred during streaming".to_string()),
        });
    }

    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty());

    Ok(ChunkContent::Delta(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_records_in_one_chunk() {
        let mut parser = RecordParser::new();
        let chunk = b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n";

        let records = parser.push(chunk).unwrap();
        assert_eq!(
            records,
            vec![
                SseRecord::Data(r#"{"a":1}"#.to_string()),
                SseRecord::Data(r#"{"b":2}"#.to_string()),
                SseRecord::Done,
            ]
        );
        assert!(parser.is_empty());
    }

    #[test]
    fn test_record_split_across_chunks() {
        let mut parser = RecordParser::new();

        assert!(parser.push(b"data: {\"choi").unwrap().is_empty());
        assert!(parser.buffer_size() > 0);

        let records = parser.push(b"ces\":[]}\n").unwrap();
        assert_eq!(records, vec![SseRecord::Data(r#"{"choices":[]}"#.to_string())]);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut parser = RecordParser::new();
        let records = parser.push(b": keep-alive\nevent: ping\n\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_sentinel() {
        let mut parser = RecordParser::new();
        assert!(parser.push(b"data: [DONE]").unwrap().is_empty());
        assert_eq!(parser.finish(), Some(SseRecord::Done));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_buffer_overflow() {
        let mut parser = RecordParser::with_capacity(100);
        let result = parser.push(&[b'a'; 150]);
        assert!(matches!(result, Err(DebateError::StreamParseError(_))));
    }

    #[test]
    fn test_parse_chunk_delta() {
        let payload = r#"{"object":"chat.completion.chunk","choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_chunk(payload).unwrap(), ChunkContent::Delta(Some("Hel".to_string())));
    }

    #[test]
    fn test_parse_chunk_without_content() {
        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        let finish = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let empty = r#"{"choices":[{"delta":{"content":""}}]}"#;

        assert_eq!(parse_chunk(role_only).unwrap(), ChunkContent::Delta(None));
        assert_eq!(parse_chunk(finish).unwrap(), ChunkContent::Delta(None));
        assert_eq!(parse_chunk(empty).unwrap(), ChunkContent::Delta(None));
    }

    #[test]
    fn test_parse_chunk_error_object() {
        let payload = r#"{"error":{"message":"overloaded","type":"server_error"}}"#;
        assert_eq!(
            parse_chunk(payload).unwrap(),
            ChunkContent::ApiError {
                kind: Some("server_error".to_string()),
                message: "overloaded".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_chunk_invalid_json() {
        assert!(matches!(parse_chunk("{not json"), Err(DebateError::StreamParseError(_))));
    }
}
