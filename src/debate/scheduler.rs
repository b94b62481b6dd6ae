//! Turn scheduler
//!
//! Drives a fixed number of rounds over a shared conversation history:
//!
//! 1. **RoundStart**: every `moderation_interval` rounds (never before the
//!    first) a random moderator line is appended
//! 2. **CollectingThoughts**: each eligible agent produces private thoughts,
//!    sequentially, against the same history snapshot
//! 3. **SelectingSpeaker**: thoughts are ranked by `speakNextProb`
//!    descending; equal probabilities are ordered at random
//! 4. **Responding**: the top agent answers and its line joins the history
//! 5. **RoundEnd**: the record is persisted and the speaker remembered
//!
//! With anti-repetition on, the previous speaker neither thinks nor speaks
//! in the following round. All randomness comes from one injectable `StdRng`.

use crate::agent::{opening_line, AgentPipeline};
use crate::debate::moderator::default_comments;
use crate::debate::output::DebateSink;
use crate::debate::state::{RoundEvent, RoundPhase};
use crate::display::{DebateObserver, SilentObserver};
use crate::errors::{DebateError, Result};
use crate::models::UsageLedger;
use crate::types::{Agent, AgentThought, DebateRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Usage ledger descriptions
pub const THOUGHTS_CALL: &str = "Agent thoughts";
pub const RESPONSE_CALL: &str = "Agent response";

/// Round configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateSettings {
    pub rounds: usize,

    /// Rounds between moderator interjections, 0 disables them
    pub moderation_interval: usize,

    /// Let the same agent speak in consecutive rounds
    pub allow_speaking_twice: bool,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            rounds: 10,
            moderation_interval: 4,
            allow_speaking_twice: false,
        }
    }
}

/// Order thoughts for speaker selection, best candidate first
///
/// Drops the previous speaker when `exclude_previous` is set. Candidates are
/// shuffled before a stable descending sort, so ties land in random order.
pub fn rank_thoughts<'a, R: Rng + ?Sized>(
    thoughts: &'a [AgentThought],
    previous_speaker: Option<&str>,
    exclude_previous: bool,
    rng: &mut R,
) -> Vec<&'a AgentThought> {
    let mut ranked: Vec<&AgentThought> = thoughts
        .iter()
        .filter(|t| !(exclude_previous && Some(t.agent_name.as_str()) == previous_speaker))
        .collect();

    ranked.shuffle(rng);
    ranked.sort_by(|a, b| b.speak_next_prob.total_cmp(&a.speak_next_prob));
    ranked
}

/// Runs the debate rounds
pub struct TurnScheduler {
    pipeline: AgentPipeline,
    agents: Vec<Agent>,
    settings: DebateSettings,
    moderator_comments: Vec<String>,
    rng: StdRng,
    observer: Arc<dyn DebateObserver>,
    sink: Option<Box<dyn DebateSink>>,

    /// Append-only conversation lines
    history: Vec<String>,

    previous_speaker: Option<String>,
    phase: RoundPhase,
    rounds_completed: usize,
    record: DebateRecord,
    usage: UsageLedger,
}

impl TurnScheduler {
    /// Create a scheduler whose history opens with the moderator's welcome
    pub fn new(pipeline: AgentPipeline, agents: Vec<Agent>, settings: DebateSettings) -> Result<Self> {
        if agents.is_empty() {
            return Err(DebateError::ConfigError("A debate needs at least one agent".to_string()));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = agents.iter().find(|a| !seen.insert(a.name.as_str())) {
            return Err(DebateError::ConfigError(format!("Duplicate agent name: {}", dup.name)));
        }

        let history = vec![opening_line(pipeline.problem(), &agents)];
        let phase = if settings.rounds == 0 {
            RoundPhase::Finished
        } else {
            RoundPhase::RoundStart
        };

        Ok(Self {
            pipeline,
            agents,
            settings,
            moderator_comments: default_comments(),
            rng: StdRng::from_entropy(),
            observer: Arc::new(SilentObserver),
            sink: None,
            history,
            previous_speaker: None,
            phase,
            rounds_completed: 0,
            record: DebateRecord::default(),
            usage: UsageLedger::new(),
        })
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Fix tie-breaks and moderator picks
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_observer(mut self, observer: Arc<dyn DebateObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn DebateSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the moderator pool; an empty pool silences the moderator
    pub fn with_moderator_comments(mut self, comments: Vec<String>) -> Self {
        self.moderator_comments = comments;
        self
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn record(&self) -> &DebateRecord {
        &self.record
    }

    pub fn usage(&self) -> &UsageLedger {
        &self.usage
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn previous_speaker(&self) -> Option<&str> {
        self.previous_speaker.as_deref()
    }

    /// Run every remaining round
    pub async fn run(&mut self) -> Result<&DebateRecord> {
        if self.rounds_completed == 0 {
            let names: Vec<String> = self.agents.iter().map(|a| a.name.clone()).collect();
            self.observer.debate_started(self.pipeline.problem(), &names);
        }

        while !self.phase.is_terminal() {
            self.run_round().await?;
        }

        info!(rounds = self.rounds_completed, "debate finished");
        Ok(&self.record)
    }

    /// Run the next round
    pub async fn run_round(&mut self) -> Result<()> {
        if self.phase != RoundPhase::RoundStart {
            return Err(DebateError::InvalidTransition {
                from: format!("{:?}", self.phase),
                to: format!("{:?}", RoundPhase::RoundStart),
                reason: "A round can only start from RoundStart".to_string(),
            });
        }

        let round = self.rounds_completed;
        self.observer.round_started(round);
        info!(round = round + 1, total = self.settings.rounds, "round started");

        if let Some(line) = self.moderator_line(round) {
            info!(round = round + 1, %line, "moderator interjects");
            self.observer.moderator_spoke(&line);
            self.history.push(line);
        }
        self.advance(RoundEvent::ModeratorDone)?;

        let thoughts = self.collect_thoughts().await;
        self.record.thoughts.push(thoughts.clone());
        self.advance(RoundEvent::ThoughtsCollected)?;

        let exclude_previous = !self.settings.allow_speaking_twice;
        let chosen = rank_thoughts(
            &thoughts,
            self.previous_speaker.as_deref(),
            exclude_previous,
            &mut self.rng,
        )
        .first()
        .map(|t| (*t).clone())
        .ok_or(DebateError::NoEligibleSpeaker { round })?;

        let speaker = self
            .agents
            .iter()
            .find(|a| a.name == chosen.agent_name)
            .cloned()
            .ok_or_else(|| DebateError::UnknownAgent(chosen.agent_name.clone()))?;

        info!(round = round + 1, speaker = %speaker.name, speak_next_prob = chosen.speak_next_prob, "speaker selected");
        self.observer.speaker_selected(&speaker.name);
        self.advance(RoundEvent::SpeakerChosen)?;

        let contribution = self
            .pipeline
            .produce_response(&speaker, &self.history, &chosen.thoughts, self.observer.as_ref())
            .await;
        self.usage.record(RESPONSE_CALL, contribution.statistics);

        if contribution.is_ok() && !contribution.value.response.is_empty() {
            self.history.push(contribution.value.response.clone());
        } else {
            warn!(round = round + 1, speaker = %speaker.name, "empty response, history unchanged");
        }
        self.record.responses.push(contribution.value);
        self.advance(RoundEvent::ResponseRecorded)?;

        self.persist();
        self.previous_speaker = Some(speaker.name);
        self.rounds_completed += 1;

        let event = if self.rounds_completed >= self.settings.rounds {
            RoundEvent::LastRoundDone
        } else {
            RoundEvent::NextRound
        };
        self.advance(event)
    }

    fn advance(&mut self, event: RoundEvent) -> Result<()> {
        let next = self.phase.transition(event)?;
        debug!(from = ?self.phase, to = ?next, "round phase");
        self.phase = next;
        Ok(())
    }

    fn moderator_line(&mut self, round: usize) -> Option<String> {
        let interval = self.settings.moderation_interval;
        if interval == 0 || round == 0 || round % interval != 0 {
            return None;
        }

        self.moderator_comments
            .choose(&mut self.rng)
            .map(|comment| format!("Moderator: {}", comment))
    }

    async fn collect_thoughts(&mut self) -> Vec<AgentThought> {
        let skip = if self.settings.allow_speaking_twice {
            None
        } else {
            self.previous_speaker.as_deref()
        };

        let mut thoughts = Vec::with_capacity(self.agents.len());
        let mut statistics = Vec::with_capacity(self.agents.len());

        for agent in self.agents.iter().filter(|a| Some(a.name.as_str()) != skip) {
            let contribution = self
                .pipeline
                .produce_thoughts(agent, &self.history, self.observer.as_ref())
                .await;

            if let Some(error) = &contribution.error {
                warn!(agent = %agent.name, kind = %error.kind, "thoughts failed, ranking agent last");
            }

            statistics.push(contribution.statistics);
            thoughts.push(contribution.value);
        }

        for stats in statistics {
            self.usage.record(THOUGHTS_CALL, stats);
        }

        thoughts
    }

    fn persist(&self) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist(&self.record) {
                warn!(error = %e, "failed to persist debate record");
            }
        }
    }
}

impl std::fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("agents", &self.agents.len())
            .field("settings", &self.settings)
            .field("phase", &self.phase)
            .field("rounds_completed", &self.rounds_completed)
            .field("previous_speaker", &self.previous_speaker)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TokenCounter;
    use crate::models::ModelId;
    use crate::streaming::{BackendFault, ByteStream, ChatBackend, ChatRequest, InferenceSession};
    use async_trait::async_trait;
    use bytes::Bytes;

    fn thought(name: &str, prob: f64) -> AgentThought {
        AgentThought {
            agent_name: name.to_string(),
            speak_next_prob: prob,
            thoughts: String::new(),
        }
    }

    #[test]
    fn test_rank_orders_by_probability() {
        let thoughts = vec![thought("A", 0.1), thought("B", 0.9), thought("C", 0.5)];
        let mut rng = StdRng::seed_from_u64(1);

        let names: Vec<&str> = rank_thoughts(&thoughts, None, true, &mut rng)
            .iter()
            .map(|t| t.agent_name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_rank_excludes_previous_speaker() {
        let thoughts = vec![thought("A", 0.9), thought("B", 0.2)];
        let mut rng = StdRng::seed_from_u64(1);

        let ranked = rank_thoughts(&thoughts, Some("A"), true, &mut rng);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].agent_name, "B");

        let ranked = rank_thoughts(&thoughts, Some("A"), false, &mut rng);
        assert_eq!(ranked[0].agent_name, "A");
    }

    #[test]
    fn test_rank_ties_follow_seed() {
        let thoughts = vec![thought("A", 0.5), thought("B", 0.5), thought("C", 0.5), thought("D", 0.1)];

        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            rank_thoughts(&thoughts, None, true, &mut rng)[0].agent_name.clone()
        };

        assert_eq!(pick(7), pick(7));

        let winners: HashSet<String> = (0..64).map(pick).collect();
        assert!(winners.len() > 1);
        assert!(!winners.contains("D"));
    }

    /// Every agent reports the same probability and says one fixed line
    struct Flat;

    #[async_trait]
    impl ChatBackend for Flat {
        async fn open_stream(&self, request: ChatRequest) -> std::result::Result<ByteStream, BackendFault> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let text = if last.contains("speakNextProb") {
                "ponder speakNextProb: 0.5"
            } else {
                "statement"
            };
            let body = format!(
                "data: {}\n\ndata: [DONE]\n\n",
                serde_json::json!({"choices": [{"delta": {"content": text}}]})
            );
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(Bytes::from(body))])))
        }
    }

    fn agent(name: &str) -> Agent {
        Agent {
            name: name.to_string(),
            bio: String::new(),
            style_example: String::new(),
            style_summary: String::new(),
        }
    }

    fn scheduler(agents: Vec<Agent>, settings: DebateSettings) -> Result<TurnScheduler> {
        let session = InferenceSession::new(Arc::new(Flat), TokenCounter::heuristic());
        let pipeline = AgentPipeline::new(session, ModelId::Gpt35Turbo, 0.0, "tea");
        TurnScheduler::new(pipeline, agents, settings)
    }

    #[test]
    fn test_rejects_empty_and_duplicate_rosters() {
        assert!(matches!(
            scheduler(vec![], DebateSettings::default()),
            Err(DebateError::ConfigError(_))
        ));
        assert!(matches!(
            scheduler(vec![agent("A"), agent("A")], DebateSettings::default()),
            Err(DebateError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_single_agent_with_anti_repetition_fails() {
        let settings = DebateSettings {
            rounds: 2,
            moderation_interval: 0,
            allow_speaking_twice: false,
        };
        let mut scheduler = scheduler(vec![agent("Solo")], settings).unwrap();

        let result = scheduler.run().await;
        assert!(matches!(result, Err(DebateError::NoEligibleSpeaker { round: 1 })));
        assert_eq!(scheduler.record().responses.len(), 1);
    }

    #[tokio::test]
    async fn test_speaking_twice_allowed() {
        let settings = DebateSettings {
            rounds: 3,
            moderation_interval: 0,
            allow_speaking_twice: true,
        };
        let mut scheduler = scheduler(vec![agent("Solo")], settings).unwrap();

        let record = scheduler.run().await.unwrap();
        assert_eq!(record.speakers(), vec!["Solo", "Solo", "Solo"]);
        assert!(scheduler.phase().is_terminal());
        assert_eq!(scheduler.history().len(), 4);
        assert_eq!(scheduler.history()[1], "Solo: statement");
    }

    #[tokio::test]
    async fn test_moderator_disabled_with_zero_interval() {
        let settings = DebateSettings {
            rounds: 4,
            moderation_interval: 0,
            allow_speaking_twice: false,
        };
        let mut scheduler = scheduler(vec![agent("A"), agent("B")], settings).unwrap();
        scheduler.run().await.unwrap();

        let moderator_lines = scheduler.history().iter().filter(|l| l.starts_with("Moderator:")).count();
        assert_eq!(moderator_lines, 1);
    }

    #[tokio::test]
    async fn test_usage_is_recorded_per_call() {
        let settings = DebateSettings {
            rounds: 2,
            moderation_interval: 0,
            allow_speaking_twice: false,
        };
        let mut scheduler = scheduler(vec![agent("A"), agent("B"), agent("C")], settings).unwrap();
        scheduler.run().await.unwrap();

        let descriptions: Vec<&str> = scheduler
            .usage()
            .entries()
            .iter()
            .map(|e| e.description.as_str())
            .collect();

        // 3 thoughts + response, then 2 thoughts + response
        assert_eq!(descriptions.len(), 7);
        assert_eq!(descriptions.iter().filter(|d| **d == RESPONSE_CALL).count(), 2);
    }

    #[tokio::test]
    async fn test_zero_rounds_is_finished() {
        let settings = DebateSettings {
            rounds: 0,
            ..DebateSettings::default()
        };
        let mut scheduler = scheduler(vec![agent("A")], settings).unwrap();

        assert!(scheduler.run().await.unwrap().responses.is_empty());
        assert!(scheduler.run_round().await.is_err());
    }
}
