//! Console echo of a running debate
//!
//! The scheduler and pipeline report progress through [`DebateObserver`].
//! Observers only watch: nothing they do is read back by the debate.

use crate::streaming::StreamError;
use colored::*;
use std::io::Write;

/// Receives progress notifications from the debate engine
///
/// Every method has a no-op default so observers implement only what they show.
pub trait DebateObserver: Send + Sync {
    fn debate_started(&self, _problem: &str, _agent_names: &[String]) {}

    /// `round` is zero-based
    fn round_started(&self, _round: usize) {}

    fn moderator_spoke(&self, _line: &str) {}

    fn thinking_started(&self, _agent_name: &str) {}

    fn speaking_started(&self, _agent_name: &str) {}

    /// One streamed delta of the current thought or response
    fn token(&self, _token: &str) {}

    /// The current thought or response finished streaming
    fn turn_finished(&self) {}

    fn speaker_selected(&self, _agent_name: &str) {}

    fn stream_failed(&self, _agent_name: &str, _error: &StreamError) {}
}

/// Observer that shows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl DebateObserver for SilentObserver {}

/// Colored terminal echo on stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    pub fn new() -> Self {
        Self
    }

    fn flush() {
        let _ = std::io::stdout().flush();
    }
}

impl DebateObserver for ConsoleObserver {
    fn debate_started(&self, problem: &str, agent_names: &[String]) {
        println!(
            "The problem is '{}'. Welcome {} to the discussion.",
            problem.bold(),
            agent_names.join(", ").cyan()
        );
    }

    fn round_started(&self, round: usize) {
        println!("\n{}", "-".repeat(17).dimmed());
        println!("{}", format!("Round {}", round + 1).bold().cyan());
        println!("{}\n", "-".repeat(17).dimmed());
    }

    fn moderator_spoke(&self, line: &str) {
        println!("{} {}", "Moderator interjects:".bold().yellow(), line);
    }

    fn thinking_started(&self, agent_name: &str) {
        println!("{}", format!("{} thinks:", agent_name).dimmed());
    }

    fn speaking_started(&self, agent_name: &str) {
        println!("\n\n{}", format!("{} says:", agent_name).bold().green());
    }

    fn token(&self, token: &str) {
        print!("{}", token);
        Self::flush();
    }

    fn turn_finished(&self) {
        println!();
    }

    fn speaker_selected(&self, agent_name: &str) {
        println!("{} {}", "Moderator: Next speaking will be".yellow(), agent_name.bold());
    }

    fn stream_failed(&self, agent_name: &str, error: &StreamError) {
        eprintln!("{} {} ({})", "✗".red(), error.to_string().red(), agent_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::StreamErrorKind;

    #[test]
    fn test_silent_observer_accepts_everything() {
        let observer: &dyn DebateObserver = &SilentObserver;
        observer.debate_started("topic", &["A".to_string()]);
        observer.round_started(0);
        observer.token("x");
        observer.stream_failed("A", &StreamError::new(StreamErrorKind::Unknown, ""));
    }

    #[test]
    fn test_console_observer_does_not_panic() {
        let observer = ConsoleObserver::new();
        observer.round_started(2);
        observer.thinking_started("Socrates");
        observer.token("Hmm");
        observer.turn_finished();
        observer.speaker_selected("Socrates");
    }
}
