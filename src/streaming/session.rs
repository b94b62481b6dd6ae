//! Streaming inference session
//!
//! Wraps one chat completion call:
//!
//! 1. Count prompt tokens and derive the response allowance
//!    (`token_limit - prompt_tokens - TOKEN_MARGIN`).
//! 2. Enforce the prompt-ratio ceiling (`ratio × token_limit`), trimming the
//!    prompt with the budget fitter when allowed.
//! 3. Emit `PromptTokenCount`, open the backend stream and relay each text
//!    delta as a `Token` while accumulating the complete message.
//! 4. Finish with `ResponseTokenCount` + `CompleteMessage`, or a single
//!    classified `Error` carrying the partial message.
//!
//! The returned stream is lazy and single-pass. Cancellation is observed
//! while waiting for the next chunk and at every chunk boundary.

use crate::context::{fit_messages, TokenCounter};
use crate::errors::DebateError;
use crate::models::{CallStatistics, ModelId};
use crate::streaming::call_log::{CallLog, CallLogEntry, CallLogKind};
use crate::streaming::client::{ChatBackend, ChatRequest};
use crate::streaming::events::{StreamError, StreamErrorKind, StreamEvent};
use crate::streaming::parser::{parse_chunk, ChunkContent, RecordParser, SseRecord};
use crate::streaming::policy::{BackendFault, ErrorPolicy};
use crate::types::Message;
use async_stream::stream;
use bytes::Bytes;
use chrono::Utc;
use futures_util::{pin_mut, Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Headroom for disagreement between the local tokenizer and the model's
pub const TOKEN_MARGIN: usize = 100;

/// Parameters of one streaming call
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub messages: Vec<Message>,
    pub model: ModelId,

    /// Free-form id tying log entries to the originating conversation
    pub correlation_id: Option<String>,

    pub cancel: Option<CancellationToken>,

    /// Share of the context window the prompt may use; model default if unset
    pub prompt_token_ratio: Option<f64>,

    /// Trim an oversized prompt instead of failing with `TOKEN_LIMIT`
    pub allow_auto_trim: bool,

    /// Sampling temperature, 0 (deterministic) if unset
    pub temperature: Option<f32>,
}

impl StreamRequest {
    pub fn new(messages: Vec<Message>, model: ModelId) -> Self {
        Self {
            messages,
            model,
            correlation_id: None,
            cancel: None,
            prompt_token_ratio: None,
            allow_auto_trim: true,
            temperature: None,
        }
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn prompt_token_ratio(mut self, ratio: f64) -> Self {
        self.prompt_token_ratio = Some(ratio);
        self
    }

    pub fn allow_auto_trim(mut self, allow: bool) -> Self {
        self.allow_auto_trim = allow;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Terminal outcome of a drained call plus its token statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub result: std::result::Result<String, StreamError>,
    pub statistics: CallStatistics,
}

/// Issues streaming inference calls against a backend
#[derive(Clone)]
pub struct InferenceSession {
    backend: Arc<dyn ChatBackend>,
    counter: TokenCounter,
    policy: Arc<ErrorPolicy>,
    call_log: Option<CallLog>,
}

impl InferenceSession {
    pub fn new(backend: Arc<dyn ChatBackend>, counter: TokenCounter) -> Self {
        Self {
            backend,
            counter,
            policy: Arc::new(ErrorPolicy::default()),
            call_log: None,
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_call_log(mut self, call_log: Option<CallLog>) -> Self {
        self.call_log = call_log;
        self
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    pub fn policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    /// Stream one completion as lifecycle events
    pub fn stream(&self, request: StreamRequest) -> impl Stream<Item = StreamEvent> + Send + '_ {
        stream! {
            let StreamRequest {
                mut messages,
                model,
                correlation_id,
                cancel,
                prompt_token_ratio,
                allow_auto_trim,
                temperature,
            } = request;

            let properties = model.properties();
            let ratio = prompt_token_ratio.unwrap_or(properties.default_prompt_token_ratio);
            let prompt_ceiling = (ratio * properties.token_limit as f64).floor() as usize;

            let mut prompt_tokens = self.counter.count_messages(&messages);
            let mut allowance = response_allowance(properties.token_limit, prompt_tokens);

            debug!(
                %model,
                prompt_tokens,
                token_limit = properties.token_limit,
                response_tokens = allowance,
                prompt_ceiling,
                "preparing completion"
            );

            if prompt_tokens > prompt_ceiling {
                if allow_auto_trim {
                    messages = fit_messages(&self.counter, &messages, prompt_ceiling, true);
                    prompt_tokens = self.counter.count_messages(&messages);
                    allowance = response_allowance(properties.token_limit, prompt_tokens);

                    debug!(
                        %model,
                        prompt_tokens,
                        response_tokens = allowance,
                        kept_messages = messages.len(),
                        "trimmed prompt to fit ratio ceiling"
                    );
                }

                if prompt_tokens > prompt_ceiling {
                    yield StreamEvent::Error(StreamError::new(StreamErrorKind::TokenLimit, ""));
                    return;
                } else if messages.iter().all(Message::is_system) {
                    // Only a kept system message survived the trim
                    yield StreamEvent::Error(StreamError::new(StreamErrorKind::LastMessageTooLarge, ""));
                    return;
                }
            }

            yield StreamEvent::PromptTokenCount(prompt_tokens);

            if let Some(log) = &self.call_log {
                log.append(&CallLogEntry {
                    correlation_id: correlation_id.as_deref(),
                    kind: CallLogKind::MessagesSent,
                    model,
                    messages: &messages,
                    response: None,
                    token_count: prompt_tokens,
                    timestamp: Utc::now(),
                });
            }

            let chat = ChatRequest::new(model, messages.clone(), allowance, temperature.unwrap_or(0.0))
                .with_cancel(cancel.clone());

            let mut body = match self.backend.open_stream(chat).await {
                Ok(body) => body,
                Err(fault) => {
                    yield StreamEvent::Error(self.classify(&fault, String::new()));
                    return;
                }
            };

            let mut parser = RecordParser::new();
            let mut complete_message = String::new();
            let mut done = false;

            while !done {
                let chunk = match next_chunk(&mut body, cancel.as_ref()).await {
                    NextChunk::Cancelled => {
                        debug!(%model, partial_len = complete_message.len(), "completion cancelled");
                        yield StreamEvent::Error(StreamError::new(
                            StreamErrorKind::ManualAbort,
                            complete_message.clone(),
                        ));
                        return;
                    }
                    NextChunk::Exhausted => break,
                    NextChunk::Fault(fault) => {
                        yield StreamEvent::Error(self.classify(&fault, complete_message.clone()));
                        return;
                    }
                    NextChunk::Chunk(chunk) => chunk,
                };

                let records = match parser.push(&chunk) {
                    Ok(records) => records,
                    Err(e) => {
                        let fault = BackendFault::Protocol(e.to_string());
                        yield StreamEvent::Error(self.classify(&fault, complete_message.clone()));
                        return;
                    }
                };

                match apply_records(records, &mut complete_message, &mut done) {
                    Ok(tokens) => {
                        for token in tokens {
                            yield StreamEvent::Token(token);
                        }
                    }
                    Err(fault) => {
                        yield StreamEvent::Error(self.classify(&fault, complete_message.clone()));
                        return;
                    }
                }
            }

            if !done {
                let trailing: Vec<SseRecord> = parser.finish().into_iter().collect();
                match apply_records(trailing, &mut complete_message, &mut done) {
                    Ok(tokens) => {
                        for token in tokens {
                            yield StreamEvent::Token(token);
                        }
                    }
                    Err(fault) => {
                        yield StreamEvent::Error(self.classify(&fault, complete_message.clone()));
                        return;
                    }
                }
            }

            if !done {
                warn!(%model, partial_len = complete_message.len(), "stream ended without terminal sentinel");
                yield StreamEvent::Error(StreamError::new(StreamErrorKind::UnexpectedEnd, complete_message));
                return;
            }

            if let Some(log) = &self.call_log {
                log.append(&CallLogEntry {
                    correlation_id: correlation_id.as_deref(),
                    kind: CallLogKind::SuccessfulResponse,
                    model,
                    messages: &messages,
                    response: Some(&complete_message),
                    token_count: prompt_tokens,
                    timestamp: Utc::now(),
                });
            }

            let response_tokens = self
                .counter
                .count_messages(&[Message::assistant(complete_message.as_str())]);

            yield StreamEvent::ResponseTokenCount(response_tokens);
            yield StreamEvent::CompleteMessage(complete_message);
        }
    }

    /// Drain a call and keep only its terminal outcome and token statistics
    pub async fn ask(&self, request: StreamRequest) -> CallOutcome {
        let mut statistics = CallStatistics::new(request.model);
        let events = self.stream(request);
        pin_mut!(events);

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::PromptTokenCount(count) => statistics.prompt_tokens = count,
                StreamEvent::ResponseTokenCount(count) => statistics.response_tokens = count,
                StreamEvent::CompleteMessage(message) => {
                    return CallOutcome {
                        result: Ok(message),
                        statistics,
                    }
                }
                StreamEvent::Error(error) => {
                    return CallOutcome {
                        result: Err(error),
                        statistics,
                    }
                }
                StreamEvent::Token(_) => {}
            }
        }

        CallOutcome {
            result: Err(StreamError::new(StreamErrorKind::Unknown, "")),
            statistics,
        }
    }

    fn classify(&self, fault: &BackendFault, partial_message: String) -> StreamError {
        let kind = self.policy.classify(fault);
        warn!(%fault, %kind, retryable = kind.is_retryable(), "completion failed");
        StreamError::new(kind, partial_message)
    }
}

impl std::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("policy", &self.policy)
            .field("call_log", &self.call_log)
            .finish_non_exhaustive()
    }
}

fn response_allowance(token_limit: usize, prompt_tokens: usize) -> usize {
    token_limit
        .saturating_sub(prompt_tokens)
        .saturating_sub(TOKEN_MARGIN)
}

enum NextChunk {
    Chunk(Bytes),
    Fault(BackendFault),
    Exhausted,
    Cancelled,
}

async fn next_chunk(
    body: &mut crate::streaming::client::ByteStream,
    cancel: Option<&CancellationToken>,
) -> NextChunk {
    if cancel.is_some_and(|token| token.is_cancelled()) {
        return NextChunk::Cancelled;
    }

    let item = match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => return NextChunk::Cancelled,
            item = body.next() => item,
        },
        None => body.next().await,
    };

    match item {
        Some(Ok(chunk)) => NextChunk::Chunk(chunk),
        Some(Err(BackendFault::Cancelled)) => NextChunk::Cancelled,
        Some(Err(fault)) => NextChunk::Fault(fault),
        None => NextChunk::Exhausted,
    }
}

/// Fold records into the running message; returns the deltas to emit
fn apply_records(
    records: Vec<SseRecord>,
    complete_message: &mut String,
    done: &mut bool,
) -> std::result::Result<Vec<String>, BackendFault> {
    let mut tokens = Vec::new();

    for record in records {
        match record {
            SseRecord::Done => {
                *done = true;
                break;
            }
            SseRecord::Data(payload) => match parse_chunk(&payload) {
                Ok(ChunkContent::Delta(Some(token))) => {
                    complete_message.push_str(&token);
                    tokens.push(token);
                }
                Ok(ChunkContent::Delta(None)) => {}
                Ok(ChunkContent::ApiError { kind, message }) => {
                    return Err(BackendFault::Api { kind, message });
                }
                Err(DebateError::StreamParseError(msg)) => return Err(BackendFault::Protocol(msg)),
                Err(e) => return Err(BackendFault::Protocol(e.to_string())),
            },
        }
    }

    Ok(tokens)
}
