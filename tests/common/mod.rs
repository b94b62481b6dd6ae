//! Shared stub backend for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use roundtable::streaming::{BackendFault, ByteStream, ChatBackend, ChatRequest};
use roundtable::types::Agent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn agent(name: &str) -> Agent {
    Agent {
        name: name.to_string(),
        bio: format!("{} has strong opinions.", name),
        style_example: format!("{} speaks plainly.", name),
        style_summary: "Direct".to_string(),
    }
}

/// One SSE record carrying a text delta
pub fn delta(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": text}}]})
    )
}

pub const DONE: &str = "data: [DONE]\n\n";

/// Stream `text` word by word, then the sentinel
pub fn canned_stream(text: &str) -> ByteStream {
    let mut chunks: Vec<Result<Bytes, BackendFault>> = text
        .split_inclusive(' ')
        .map(|word| Ok(Bytes::from(delta(word))))
        .collect();
    chunks.push(Ok(Bytes::from(DONE)));
    Box::pin(stream::iter(chunks))
}

/// Name of the agent a request speaks for, read from the system prompt
pub fn speaker_of(request: &ChatRequest) -> Option<String> {
    let system = request.messages.iter().find(|m| m.is_system())?;
    let rest = system.content.strip_prefix("You are ")?;
    rest.split(',').next().map(str::to_string)
}

pub fn is_thoughts_request(request: &ChatRequest) -> bool {
    request
        .messages
        .last()
        .is_some_and(|m| m.content.contains("speakNextProb"))
}

/// Deterministic debate backend
///
/// Each agent reports a fixed probability in its thoughts and answers with a
/// numbered line. Agents listed in `failing_thoughts` get the configured
/// status instead of thoughts; `failing_responses` does the same for every
/// response call.
#[derive(Default)]
pub struct ScriptedBackend {
    pub probabilities: HashMap<String, f64>,
    pub failing_thoughts: HashMap<String, u16>,
    pub failing_responses: Option<u16>,
    pub requests: Mutex<Vec<ChatRequest>>,
    responses: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(probabilities: &[(&str, f64)]) -> Self {
        Self {
            probabilities: probabilities
                .iter()
                .map(|(name, p)| (name.to_string(), *p))
                .collect(),
            ..Self::default()
        }
    }

    pub fn fail_thoughts_for(mut self, name: &str, status: u16) -> Self {
        self.failing_thoughts.insert(name.to_string(), status);
        self
    }

    pub fn fail_responses(mut self, status: u16) -> Self {
        self.failing_responses = Some(status);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream, BackendFault> {
        let name = speaker_of(&request).unwrap_or_default();
        let thoughts = is_thoughts_request(&request);
        self.requests.lock().unwrap().push(request);

        let failure = if thoughts {
            self.failing_thoughts.get(&name).copied()
        } else {
            self.failing_responses
        };
        if let Some(status) = failure {
            return Err(BackendFault::Status {
                status,
                body: "{\"error\":{}}".to_string(),
            });
        }

        if thoughts {
            let prob = self.probabilities.get(&name).copied().unwrap_or(0.0);
            Ok(canned_stream(&format!("I should weigh in. speakNextProb: {}", prob)))
        } else {
            let n = self.responses.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(canned_stream(&format!("point number {}.", n)))
        }
    }
}
