use crate::debate::DebateSettings;
use crate::models::ModelId;
use crate::streaming::DEFAULT_API_BASE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub debate: DebateConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    pub model: ModelId,
    pub rounds: usize,
    pub temperature: f32,
    pub moderation_interval: usize,
    pub allow_speaking_twice: bool,

    /// Replaces the built-in moderator pool when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_comments: Option<Vec<String>>,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            model: ModelId::Gpt35Turbo,
            rounds: 10,
            temperature: 0.5,
            moderation_interval: 4,
            allow_speaking_twice: false,
            moderator_comments: None,
        }
    }
}

impl DebateConfig {
    pub fn settings(&self) -> DebateSettings {
        DebateSettings {
            rounds: self.rounds,
            moderation_interval: self.moderation_interval,
            allow_speaking_twice: self.allow_speaking_twice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub agents_file: PathBuf,

    /// NDJSON log of every prompt and response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_log: Option<PathBuf>,

    /// HuggingFace `tokenizer.json`; the character heuristic is used otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            agents_file: PathBuf::from("data").join("premade_agents.json"),
            call_log: None,
            tokenizer: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".roundtable").join("config.toml"))
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.openai.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| format!("Environment variable {} is not set", self.openai.api_key_env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.openai.api_base, "https://api.openai.com/v1");
        assert_eq!(config.debate.model, ModelId::Gpt35Turbo);
        assert_eq!(config.debate.rounds, 10);
        assert_eq!(config.debate.moderation_interval, 4);
        assert!(!config.debate.allow_speaking_twice);
        assert!(config.paths.call_log.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [debate]
            model = "gpt-4"
            rounds = 3

            [paths]
            call_log = "gpt.ndjson"
            "#,
        )
        .unwrap();

        assert_eq!(config.debate.model, ModelId::Gpt4);
        assert_eq!(config.debate.rounds, 3);
        assert_eq!(config.debate.temperature, 0.5);
        assert_eq!(config.paths.call_log, Some(PathBuf::from("gpt.ndjson")));
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.debate.moderator_comments = Some(vec!["Anyone disagree?".to_string()]);
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_api_key_from_named_variable() {
        let mut config = Config::default();
        config.openai.api_key_env = "ROUNDTABLE_TEST_KEY_UNSET".to_string();
        assert!(config.api_key().is_err());

        config.openai.api_key_env = "ROUNDTABLE_TEST_KEY_SET".to_string();
        std::env::set_var("ROUNDTABLE_TEST_KEY_SET", "sk-test");
        assert_eq!(config.api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_settings_projection() {
        let config = DebateConfig {
            rounds: 5,
            moderation_interval: 2,
            allow_speaking_twice: true,
            ..DebateConfig::default()
        };

        assert_eq!(
            config.settings(),
            DebateSettings {
                rounds: 5,
                moderation_interval: 2,
                allow_speaking_twice: true,
            }
        );
    }
}
