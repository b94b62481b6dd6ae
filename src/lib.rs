//! Roundtable - Multi-agent debate engine
//!
//! Persona-bound agents take turns against a streaming chat model. Each
//! round every eligible agent thinks privately and reports how much it wants
//! to speak; the scheduler picks one speaker whose reply joins the shared
//! conversation.
//!
//! # Architecture
//!
//! - **context**: token counting and fitting prompts into a token ceiling
//! - **streaming**: one completion call as a lazy stream of lifecycle events
//! - **agent**: prompt composition and the thought/response pipeline
//! - **debate**: round state machine and turn scheduler

pub mod errors;
pub mod types;
pub mod context;
pub mod models;
pub mod streaming;
pub mod agent;
pub mod debate;

// Collaborators around the core
pub mod registry;
pub mod display;
pub mod telemetry;
pub mod config;
pub mod cli;

// Re-export commonly used types
pub use errors::{DebateError, Result};
pub use agent::AgentPipeline;
pub use debate::{DebateSettings, TurnScheduler};
pub use streaming::{InferenceSession, StreamEvent, StreamRequest};
