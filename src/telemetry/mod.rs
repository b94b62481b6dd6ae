//! Telemetry for Roundtable
//!
//! Tracing subscriber setup plus an in-memory collector that counts what a
//! debate did (tokens streamed, turns taken, calls failed).

use crate::cli::Verbosity;
use crate::display::DebateObserver;
use crate::streaming::{StreamError, StreamErrorKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over the verbosity flags.
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Debate statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub rounds_started: usize,
    pub thoughts_requested: usize,
    pub responses_requested: usize,
    pub tokens_streamed: usize,
    pub moderator_interjections: usize,
    pub failed_calls: usize,

    /// Failures by kind
    pub failures: HashMap<StreamErrorKind, usize>,

    /// Turns spoken per agent
    pub turns: HashMap<String, usize>,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TelemetryStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        self.lock().clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of calls that finished without a stream error
    pub fn call_success_rate(&self) -> f64 {
        let stats = self.lock();
        let total = stats.thoughts_requested + stats.responses_requested;
        if total == 0 {
            1.0
        } else {
            total.saturating_sub(stats.failed_calls) as f64 / total as f64
        }
    }

    /// Render a short summary block
    pub fn summary(&self) -> String {
        let stats = self.get_stats();
        let mut turns: Vec<(&String, &usize)> = stats.turns.iter().collect();
        turns.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut out = String::new();
        out.push_str("Debate Summary\n");
        out.push_str("─────────────────────────────────────\n");
        out.push_str(&format!("Duration:          {:.1?}\n", self.elapsed()));
        out.push_str(&format!("Rounds:            {}\n", stats.rounds_started));
        out.push_str(&format!("Tokens streamed:   {}\n", stats.tokens_streamed));
        out.push_str(&format!("Interjections:     {}\n", stats.moderator_interjections));
        out.push_str(&format!("Success rate:      {:.1}%\n", self.call_success_rate() * 100.0));
        for (name, count) in turns {
            out.push_str(&format!("  {:<16} {} turn(s)\n", name, count));
        }
        out
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl DebateObserver for TelemetryCollector {
    fn round_started(&self, _round: usize) {
        self.lock().rounds_started += 1;
    }

    fn moderator_spoke(&self, _line: &str) {
        self.lock().moderator_interjections += 1;
    }

    fn thinking_started(&self, _agent_name: &str) {
        self.lock().thoughts_requested += 1;
    }

    fn speaking_started(&self, agent_name: &str) {
        let mut stats = self.lock();
        stats.responses_requested += 1;
        *stats.turns.entry(agent_name.to_string()).or_insert(0) += 1;
    }

    fn token(&self, _token: &str) {
        self.lock().tokens_streamed += 1;
    }

    fn stream_failed(&self, _agent_name: &str, error: &StreamError) {
        let mut stats = self.lock();
        stats.failed_calls += 1;
        *stats.failures.entry(error.kind).or_insert(0) += 1;
    }
}

/// Forwards every notification to several observers in order
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn DebateObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn DebateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl DebateObserver for ObserverSet {
    fn debate_started(&self, problem: &str, agent_names: &[String]) {
        self.observers.iter().for_each(|o| o.debate_started(problem, agent_names));
    }

    fn round_started(&self, round: usize) {
        self.observers.iter().for_each(|o| o.round_started(round));
    }

    fn moderator_spoke(&self, line: &str) {
        self.observers.iter().for_each(|o| o.moderator_spoke(line));
    }

    fn thinking_started(&self, agent_name: &str) {
        self.observers.iter().for_each(|o| o.thinking_started(agent_name));
    }

    fn speaking_started(&self, agent_name: &str) {
        self.observers.iter().for_each(|o| o.speaking_started(agent_name));
    }

    fn token(&self, token: &str) {
        self.observers.iter().for_each(|o| o.token(token));
    }

    fn turn_finished(&self) {
        self.observers.iter().for_each(|o| o.turn_finished());
    }

    fn speaker_selected(&self, agent_name: &str) {
        self.observers.iter().for_each(|o| o.speaker_selected(agent_name));
    }

    fn stream_failed(&self, agent_name: &str, error: &StreamError) {
        self.observers.iter().for_each(|o| o.stream_failed(agent_name, error));
    }
}
