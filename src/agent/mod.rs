//! Agent turn module
//!
//! Prompt composition and the per-agent thought/response pipeline.

pub mod prompts;
pub mod pipeline;

// Re-export commonly used types
pub use pipeline::{parse_speak_next_prob, AgentPipeline, Contribution};
pub use prompts::{opening_line, project_history, SPEAK_NEXT_PROB_TOKEN};
