//! Persona registry
//!
//! A JSON object mapping agent id to persona:
//!
//! ```json
//! { "socrates": { "name": "Socrates", "bio": "...", "styleExample": "...", "gpt4Summary": "..." } }
//! ```
//!
//! Loaded once before the debate starts and read-only afterwards.

use crate::errors::{DebateError, Result};
use crate::types::Agent;
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Read-only mapping from agent id to persona
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Agent>,
}

impl AgentRegistry {
    pub fn new(agents: BTreeMap<String, Agent>) -> Self {
        Self { agents }
    }

    /// Load the registry from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent registry {}", path.display()))?;

        Self::from_json(&json)
            .with_context(|| format!("Failed to parse agent registry {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let agents: BTreeMap<String, Agent> = serde_json::from_str(json)?;
        Ok(Self::new(agents))
    }

    /// Agent ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Roster for the given ids, in the given order; every agent when empty
    pub fn select(&self, ids: &[String]) -> Result<Vec<Agent>> {
        if ids.is_empty() {
            return Ok(self.agents.values().cloned().collect());
        }

        ids.iter()
            .map(|id| {
                self.agents
                    .get(id)
                    .cloned()
                    .ok_or_else(|| DebateError::UnknownAgent(id.clone()))
            })
            .collect()
    }
}
