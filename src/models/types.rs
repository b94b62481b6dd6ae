//! Model identifiers and their static properties
//!
//! Context-window sizes, default prompt/response split and pricing per
//! accepted chat model. The table is immutable for the life of the process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat models the debate engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,

    #[serde(rename = "gpt-4")]
    Gpt4,
}

/// Cost in USD per thousand tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostPerMille {
    pub prompt: f64,
    pub response: f64,
}

/// Static properties of a chat model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProperties {
    pub readable_name: &'static str,

    /// Total tokens accepted by the model (prompt + response)
    pub token_limit: usize,

    /// Fraction of the window a prompt may use before it crowds out the reply
    pub default_prompt_token_ratio: f64,

    pub cost_per_mille: CostPerMille,
}

const GPT_35_TURBO: ModelProperties = ModelProperties {
    readable_name: "GPT-3.5",
    token_limit: 4096,
    default_prompt_token_ratio: 0.75,
    cost_per_mille: CostPerMille {
        prompt: 0.002,
        response: 0.002,
    },
};

const GPT_4: ModelProperties = ModelProperties {
    readable_name: "GPT-4.0",
    token_limit: 8192,
    default_prompt_token_ratio: 0.8,
    cost_per_mille: CostPerMille {
        prompt: 0.03,
        response: 0.06,
    },
};

impl ModelId {
    pub const ALL: [ModelId; 2] = [ModelId::Gpt35Turbo, ModelId::Gpt4];

    /// Identifier sent to the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gpt35Turbo => "gpt-3.5-turbo",
            ModelId::Gpt4 => "gpt-4",
        }
    }

    pub fn properties(&self) -> &'static ModelProperties {
        match self {
            ModelId::Gpt35Turbo => &GPT_35_TURBO,
            ModelId::Gpt4 => &GPT_4,
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::Gpt35Turbo
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unsupported model '{}', expected one of: gpt-3.5-turbo, gpt-4", s))
    }
}
