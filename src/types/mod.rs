//! Type definitions module
//!
//! Core types for chat messages and debate records.

pub mod messages;
pub mod debate;

// Re-export commonly used types
pub use messages::{Message, Role};
pub use debate::{Agent, AgentResponse, AgentThought, DebateRecord};
