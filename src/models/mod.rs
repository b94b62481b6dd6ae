//! Chat model catalogue and usage accounting
//!
//! - Static per-model properties (context window, prompt ratio, pricing)
//! - Per-call token statistics and the cost ledger

pub mod types;
pub mod usage;

// Re-export key types for convenience
pub use types::{CostPerMille, ModelId, ModelProperties};
pub use usage::{CallStatistics, LedgerEntry, UsageLedger};
