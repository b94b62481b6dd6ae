//! Durable output of a debate
//!
//! The scheduler hands the full record to a [`DebateSink`] after every round.
//! Sink failures are logged by the caller and never stop the debate.

use crate::types::DebateRecord;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Persists the accumulated thoughts and responses
pub trait DebateSink: Send + Sync {
    fn persist(&self, record: &DebateRecord) -> Result<()>;
}

/// Rewrites a pretty-printed JSON file after every round
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DebateSink for JsonFileSink {
    fn persist(&self, record: &DebateRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .context("Failed to serialize debate record")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write debate output to {}", self.path.display()))?;

        Ok(())
    }
}
