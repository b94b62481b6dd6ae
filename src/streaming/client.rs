//! Chat completion backend
//!
//! [`ChatBackend`] is the seam between the inference session and the
//! network: it opens one streamed completion and hands back the raw byte
//! chunks. [`OpenAiClient`] implements it over HTTP with reqwest; tests plug
//! in canned backends.
//!
//! No request timeout is configured: completions stream for as long as the
//! model keeps talking, and only the caller's cancellation token cuts them short.

use crate::errors::Result;
use crate::models::ModelId;
use crate::streaming::policy::BackendFault;
use crate::types::Message;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Default API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Raw inbound chunks of an open completion stream
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BackendFault>> + Send>>;

/// Parameters of one streamed completion
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: ModelId,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub cancel: Option<CancellationToken>,
}

impl ChatRequest {
    /// Request with nucleus sampling and penalties disabled
    pub fn new(model: ModelId, messages: Vec<Message>, max_tokens: usize, temperature: f32) -> Self {
        Self {
            model,
            messages,
            max_tokens,
            temperature,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Opens streamed chat completions
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn open_stream(&self, request: ChatRequest) -> std::result::Result<ByteStream, BackendFault>;
}

/// HTTP client for OpenAI-compatible chat completion endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create client against the default endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(DEFAULT_API_BASE, api_key)
    }

    /// Create client with custom configuration
    pub fn with_config(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, body: &CompletionRequestBody<'_>) -> std::result::Result<ByteStream, BackendFault> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendFault::Transport(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendFault::Status { status, body });
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| BackendFault::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn open_stream(&self, request: ChatRequest) -> std::result::Result<ByteStream, BackendFault> {
        let body = CompletionRequestBody::from_request(&request);

        match &request.cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(BackendFault::Cancelled),
                result = self.send(&body) => result,
            },
            None => self.send(&body).await,
        }
    }
}

/// Wire body of a chat completion request
#[derive(Debug, Serialize)]
struct CompletionRequestBody<'a> {
    model: &'static str,
    messages: &'a [Message],
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

impl<'a> CompletionRequestBody<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        Self {
            model: request.model.as_str(),
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_config() {
        let client = OpenAiClient::with_config("http://localhost:8080/v1/", "sk-test").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_defaults() {
        let request = ChatRequest::new(ModelId::Gpt4, vec![Message::user("hi")], 500, 0.0);
        assert_eq!(request.top_p, 1.0);
        assert_eq!(request.frequency_penalty, 0.0);
        assert_eq!(request.presence_penalty, 0.0);
        assert!(request.cancel.is_none());
    }

    #[test]
    fn test_wire_body() {
        let request = ChatRequest::new(ModelId::Gpt35Turbo, vec![Message::system("rules")], 1234, 0.5);
        let body = serde_json::to_value(CompletionRequestBody::from_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 1234);
        assert_eq!(body["top_p"], 1.0);
        assert_eq!(body["stream"], true);
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let client = OpenAiClient::with_config("http://127.0.0.1:9", "sk-test").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = ChatRequest::new(ModelId::Gpt35Turbo, vec![], 10, 0.0).with_cancel(Some(cancel));
        let result = client.open_stream(request).await;
        assert!(matches!(result, Err(BackendFault::Cancelled)));
    }
}
