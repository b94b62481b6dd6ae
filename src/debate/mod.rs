//! Debate module
//!
//! Round state machine, turn scheduler, moderator pool and durable output.

pub mod state;
pub mod scheduler;
pub mod moderator;
pub mod output;

// Re-export commonly used types
pub use moderator::{default_comments, DEFAULT_MODERATOR_COMMENTS};
pub use output::{DebateSink, JsonFileSink};
pub use scheduler::{rank_thoughts, DebateSettings, TurnScheduler};
pub use state::{RoundEvent, RoundPhase};
