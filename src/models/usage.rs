//! Token usage and cost accounting
//!
//! Every inference call reports how many prompt and response tokens it used.
//! The ledger accumulates those per call description and renders a boxed
//! cost report grouped per call, per model, and in total.

use crate::models::types::ModelId;
use serde::{Deserialize, Serialize};

const REPORT_WIDTH: usize = 140;

/// Token statistics of a single inference call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatistics {
    pub model: ModelId,
    pub prompt_tokens: usize,
    pub response_tokens: usize,
}

impl CallStatistics {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            prompt_tokens: 0,
            response_tokens: 0,
        }
    }

    pub fn total_tokens(&self) -> usize {
        self.prompt_tokens + self.response_tokens
    }

    pub fn prompt_cost(&self) -> f64 {
        self.prompt_tokens as f64 * self.model.properties().cost_per_mille.prompt / 1000.0
    }

    pub fn response_cost(&self) -> f64 {
        self.response_tokens as f64 * self.model.properties().cost_per_mille.response / 1000.0
    }

    pub fn cost(&self) -> f64 {
        self.prompt_cost() + self.response_cost()
    }
}

/// A described entry in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub description: String,
    pub statistics: CallStatistics,
}

/// Accumulated usage across a chain of calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageLedger {
    entries: Vec<LedgerEntry>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, description: impl Into<String>, statistics: CallStatistics) {
        self.entries.push(LedgerEntry {
            description: description.into(),
            statistics,
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge entries sharing a description (and model), keeping first-seen order
    pub fn grouped_by_description(&self) -> Vec<LedgerEntry> {
        let mut grouped: Vec<LedgerEntry> = Vec::new();

        for entry in &self.entries {
            match grouped.iter_mut().find(|g| {
                g.description == entry.description && g.statistics.model == entry.statistics.model
            }) {
                Some(existing) => {
                    existing.statistics.prompt_tokens += entry.statistics.prompt_tokens;
                    existing.statistics.response_tokens += entry.statistics.response_tokens;
                }
                None => grouped.push(entry.clone()),
            }
        }

        grouped
    }

    /// Summed statistics for one model
    pub fn totals_for(&self, model: ModelId) -> CallStatistics {
        self.entries
            .iter()
            .filter(|e| e.statistics.model == model)
            .fold(CallStatistics::new(model), |mut acc, e| {
                acc.prompt_tokens += e.statistics.prompt_tokens;
                acc.response_tokens += e.statistics.response_tokens;
                acc
            })
    }

    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(|e| e.statistics.cost()).sum()
    }

    /// Render the boxed cost report
    ///
    /// `divide_by` adds a per-item cost to the total line.
    pub fn render_report(&self, group_by_description: bool, divide_by: Option<usize>) -> String {
        let entries = if group_by_description {
            self.grouped_by_description()
        } else {
            self.entries.clone()
        };

        let line = "#".repeat(REPORT_WIDTH + 4);

        let per_call: Vec<String> = entries
            .iter()
            .map(|e| {
                let s = &e.statistics;
                boxed(&format!(
                    "{} - Prompt: {} (${:.4}) - Response: {} (${:.4}) - Total: {} (${:.4}) run for {}",
                    s.model.properties().readable_name,
                    s.prompt_tokens,
                    s.prompt_cost(),
                    s.response_tokens,
                    s.response_cost(),
                    s.total_tokens(),
                    s.cost(),
                    e.description
                ))
            })
            .collect();

        let per_model: Vec<String> = ModelId::ALL
            .iter()
            .map(|model| {
                let s = self.totals_for(*model);
                boxed(&format!(
                    "{} total: Prompt : {} (${:.4}) - Response: {} (${:.4}) - Total: {} (${:.4})",
                    model.properties().readable_name,
                    s.prompt_tokens,
                    s.prompt_cost(),
                    s.response_tokens,
                    s.response_cost(),
                    s.total_tokens(),
                    s.cost()
                ))
            })
            .collect();

        let prompt_cost: f64 = entries.iter().map(|e| e.statistics.prompt_cost()).sum();
        let response_cost: f64 = entries.iter().map(|e| e.statistics.response_cost()).sum();
        let total = prompt_cost + response_cost;

        let per_item = match divide_by {
            Some(count) if count > 0 => format!(" (${:.4} per item)", total / count as f64),
            _ => String::new(),
        };

        let totals = boxed(&format!(
            "Total Prompt Cost: ${:.4} - Total Response Cost: ${:.4} - Total Cost: ${:.4}{}",
            prompt_cost, response_cost, total, per_item
        ));

        let mut sections = vec![line.clone()];
        sections.extend(per_call);
        sections.push(line.clone());
        sections.extend(per_model);
        sections.push(line.clone());
        sections.push(totals);
        sections.push(line);

        sections.join("\n")
    }
}

fn boxed(text: &str) -> String {
    let pad = REPORT_WIDTH.saturating_sub(text.chars().count());
    format!("# {}{} #", text, " ".repeat(pad))
}
