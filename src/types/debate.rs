//! Debate records
//!
//! Personas, per-round thoughts and public responses. Field names serialize
//! in camelCase so the output file keeps its established shape.

use serde::{Deserialize, Serialize};

/// A persona taking part in the debate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Unique, stable identifier and display name
    pub name: String,

    pub bio: String,

    /// Verbatim writing sample used to imitate the persona's voice
    pub style_example: String,

    /// Short description of the persona's speaking style
    #[serde(alias = "gpt4Summary")]
    pub style_summary: String,
}

impl Agent {
    /// Label prefixed to the agent's public utterances, e.g. `"Socrates: "`
    pub fn speaking_label(&self) -> String {
        format!("{}: ", self.name)
    }

    /// Marker used to detect the agent's own lines in history, e.g. `"Socrates:"`
    pub fn speaking_marker(&self) -> String {
        format!("{}:", self.name)
    }
}

/// Private reasoning produced by one agent in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentThought {
    pub agent_name: String,

    /// Self-reported desire to speak next, always within [0, 1]
    pub speak_next_prob: f64,

    pub thoughts: String,
}

impl AgentThought {
    /// Lowest-priority contribution used when the thought call failed
    pub fn empty(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            speak_next_prob: 0.0,
            thoughts: String::new(),
        }
    }
}

/// Public utterance of the round's chosen speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub agent_name: String,
    pub response: String,
}

/// Everything a debate produced so far, as handed to the durable output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebateRecord {
    /// One inner list per round, one thought per eligible agent
    pub thoughts: Vec<Vec<AgentThought>>,
    pub responses: Vec<AgentResponse>,
}

impl DebateRecord {
    pub fn rounds(&self) -> usize {
        self.responses.len()
    }

    pub fn speakers(&self) -> Vec<&str> {
        self.responses.iter().map(|r| r.agent_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_loads_legacy_summary_field() {
        let json = r#"{"name":"Ada","bio":"b","styleExample":"s","gpt4Summary":"terse"}"#;
        let agent: Agent = serde_json::from_str(json).unwrap();
        assert_eq!(agent.style_summary, "terse");
        assert_eq!(agent.speaking_label(), "Ada: ");
        assert_eq!(agent.speaking_marker(), "Ada:");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = DebateRecord {
            thoughts: vec![vec![AgentThought {
                agent_name: "Ada".to_string(),
                speak_next_prob: 0.5,
                thoughts: "hmm".to_string(),
            }]],
            responses: vec![AgentResponse {
                agent_name: "Ada".to_string(),
                response: "Ada: yes".to_string(),
            }],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["thoughts"][0][0]["speakNextProb"], 0.5);
        assert_eq!(json["responses"][0]["agentName"], "Ada");
        assert_eq!(record.speakers(), vec!["Ada"]);
    }
}
