//! Agent turn pipeline
//!
//! Two independent inference calls per agent:
//!
//! - **thoughts**: private reasoning ending in `speakNextProb: <float>`
//! - **response**: the public paragraph, for the round's chosen speaker only
//!
//! Stream failures never escape as errors. They come back inside a
//! [`Contribution`] whose value is the empty (lowest-priority) result.

use crate::agent::prompts::{response_messages, thoughts_messages};
use crate::display::DebateObserver;
use crate::models::{CallStatistics, ModelId};
use crate::streaming::{InferenceSession, StreamError, StreamEvent, StreamRequest};
use crate::types::{Agent, AgentResponse, AgentThought};
use futures_util::{pin_mut, stream, Stream, StreamExt};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// `speakNextProb: <number>`, case-insensitive, optional sign
static SPEAK_NEXT_PROB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)speakNextProb:\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+))")
        .expect("SPEAK_NEXT_PROB_RE regex should compile")
});

/// Result of one pipeline call
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution<T> {
    pub value: T,
    pub statistics: CallStatistics,

    /// Set when the call failed and `value` is the empty fallback
    pub error: Option<StreamError>,
}

impl<T> Contribution<T> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Split raw thought text into `(probability, thoughts)`
///
/// Probabilities are clamped to `[0, 1]`; a missing or non-finite value
/// yields 0 and the whole text as thoughts.
pub fn parse_speak_next_prob(text: &str) -> (f64, String) {
    let Some(caps) = SPEAK_NEXT_PROB_RE.captures(text) else {
        return (0.0, text.to_string());
    };

    let prob = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    let start = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
    (prob, text[..start].trim().to_string())
}

/// Runs thought and response calls for individual agents
#[derive(Debug, Clone)]
pub struct AgentPipeline {
    session: InferenceSession,
    model: ModelId,
    temperature: f32,
    problem: String,
    correlation_id: Option<String>,
}

impl AgentPipeline {
    pub fn new(session: InferenceSession, model: ModelId, temperature: f32, problem: impl Into<String>) -> Self {
        Self {
            session,
            model,
            temperature,
            problem: problem.into(),
            correlation_id: None,
        }
    }

    /// Tag every call's log entries with `id`
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    fn request(&self, messages: Vec<crate::types::Message>) -> StreamRequest {
        let request = StreamRequest::new(messages, self.model).temperature(self.temperature);
        match &self.correlation_id {
            Some(id) => request.correlation_id(id.clone()),
            None => request,
        }
    }

    /// Stream the agent's private thoughts
    pub fn stream_thoughts(&self, agent: &Agent, history: &[String]) -> impl Stream<Item = StreamEvent> + Send + '_ {
        let messages = thoughts_messages(agent, &self.problem, history);
        self.session.stream(self.request(messages))
    }

    /// Stream the agent's public response, led by its speaking label
    pub fn stream_response(
        &self,
        agent: &Agent,
        history: &[String],
        thoughts: &str,
    ) -> impl Stream<Item = StreamEvent> + Send + '_ {
        let messages = response_messages(agent, history, thoughts);
        let label = StreamEvent::Token(agent.speaking_label());
        stream::once(async move { label }).chain(self.session.stream(self.request(messages)))
    }

    /// Collect the agent's thoughts and parse its desire to speak next
    pub async fn produce_thoughts(
        &self,
        agent: &Agent,
        history: &[String],
        observer: &dyn DebateObserver,
    ) -> Contribution<AgentThought> {
        observer.thinking_started(&agent.name);

        let events = self.stream_thoughts(agent, history);
        let drained = drain(self.model, events, observer).await;
        observer.turn_finished();

        match drained.result {
            Ok(raw) => {
                let (speak_next_prob, thoughts) = parse_speak_next_prob(&raw);
                debug!(agent = %agent.name, speak_next_prob, "collected thoughts");

                Contribution {
                    value: AgentThought {
                        agent_name: agent.name.clone(),
                        speak_next_prob,
                        thoughts,
                    },
                    statistics: drained.statistics,
                    error: None,
                }
            }
            Err(error) => {
                warn!(agent = %agent.name, kind = %error.kind, "thought call failed, treating as empty contribution");
                observer.stream_failed(&agent.name, &error);

                Contribution {
                    value: AgentThought::empty(agent.name.as_str()),
                    statistics: drained.statistics,
                    error: Some(error),
                }
            }
        }
    }

    /// Collect the agent's public response, including its speaking label
    pub async fn produce_response(
        &self,
        agent: &Agent,
        history: &[String],
        thoughts: &str,
        observer: &dyn DebateObserver,
    ) -> Contribution<AgentResponse> {
        observer.speaking_started(&agent.name);

        let events = self.stream_response(agent, history, thoughts);
        let drained = drain(self.model, events, observer).await;
        observer.turn_finished();

        let (response, error) = match drained.result {
            Ok(text) => (text, None),
            Err(error) => {
                warn!(agent = %agent.name, kind = %error.kind, "response call failed, treating as empty contribution");
                observer.stream_failed(&agent.name, &error);
                (String::new(), Some(error))
            }
        };

        Contribution {
            value: AgentResponse {
                agent_name: agent.name.clone(),
                response,
            },
            statistics: drained.statistics,
            error,
        }
    }
}

struct Drained {
    result: std::result::Result<String, StreamError>,
    statistics: CallStatistics,
}

/// Concatenate token deltas, echoing each to the observer
async fn drain(model: ModelId, events: impl Stream<Item = StreamEvent>, observer: &dyn DebateObserver) -> Drained {
    pin_mut!(events);

    let mut text = String::new();
    let mut statistics = CallStatistics::new(model);

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::PromptTokenCount(count) => statistics.prompt_tokens = count,
            StreamEvent::Token(token) => {
                observer.token(&token);
                text.push_str(&token);
            }
            StreamEvent::ResponseTokenCount(count) => statistics.response_tokens = count,
            StreamEvent::CompleteMessage(_) => {
                return Drained {
                    result: Ok(text),
                    statistics,
                }
            }
            StreamEvent::Error(error) => {
                return Drained {
                    result: Err(error),
                    statistics,
                }
            }
        }
    }

    Drained {
        result: Ok(text),
        statistics,
    }
}
