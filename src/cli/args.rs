//! Command-line argument parsing for Roundtable
//!
//! Flags override the values loaded from the configuration file.

use crate::config::Config;
use crate::models::ModelId;
use clap::Parser;
use std::path::PathBuf;

/// Topic used when none is given
pub const DEFAULT_PROBLEM: &str = "Socrates: Smash or pass?";

/// Roundtable - Let a panel of AI personas debate a problem
#[derive(Parser, Debug)]
#[command(name = "roundtable")]
#[command(version)]
#[command(about = "Run a moderated multi-agent debate against a streaming chat model", long_about = None)]
pub struct Args {
    /// Problem statement to debate
    #[arg(short, long, value_name = "PROBLEM")]
    pub problem: Option<String>,

    /// Write thoughts and responses to this JSON file after every round
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Use GPT-4 instead of the configured model
    #[arg(long)]
    pub gpt4: bool,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Number of rounds
    #[arg(short, long)]
    pub rounds: Option<usize>,

    /// Don't echo the debate to the console
    #[arg(short, long)]
    pub dont_print: bool,

    /// Allow an agent to speak in consecutive rounds
    #[arg(short = 'a', long)]
    pub allow_speaking_twice: bool,

    /// Rounds between moderator interjections (0 disables them)
    #[arg(short = 'm', long, value_name = "ROUNDS")]
    pub moderation_interval: Option<usize>,

    /// Agent id to include (repeatable; all registry agents by default)
    #[arg(long = "agent", value_name = "ID")]
    pub agents: Vec<String>,

    /// Persona registry file
    #[arg(long, value_name = "PATH")]
    pub agents_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for tie-breaks and moderator picks
    #[arg(long)]
    pub seed: Option<u64>,

    /// Verbosity level: default (warnings), -v (info), -vv (debug), -vvv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            2 => Verbosity::VeryVerbose,
            _ => Verbosity::Trace,
        }
    }

    pub fn problem(&self) -> &str {
        self.problem.as_deref().unwrap_or(DEFAULT_PROBLEM)
    }

    /// Apply flag overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if self.gpt4 {
            config.debate.model = ModelId::Gpt4;
        }
        if let Some(temperature) = self.temperature {
            config.debate.temperature = temperature;
        }
        if let Some(rounds) = self.rounds {
            config.debate.rounds = rounds;
        }
        if let Some(interval) = self.moderation_interval {
            config.debate.moderation_interval = interval;
        }
        if self.allow_speaking_twice {
            config.debate.allow_speaking_twice = true;
        }
        if let Some(path) = &self.agents_file {
            config.paths.agents_file = path.clone();
        }
    }

    /// Check flag values that clap cannot
    pub fn validate(&self) -> Result<(), String> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("Temperature must be between 0 and 2, got {}", temperature));
            }
        }

        if self.problem.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err("Problem statement cannot be empty.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Default log filter directive for this level
    pub fn log_directive(&self) -> &'static str {
        match self {
            Verbosity::Normal => "roundtable=warn",
            Verbosity::Verbose => "roundtable=info",
            Verbosity::VeryVerbose => "roundtable=debug",
            Verbosity::Trace => "roundtable=trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("roundtable").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.problem(), DEFAULT_PROBLEM);
        assert_eq!(args.verbosity(), Verbosity::Normal);
        assert!(args.agents.is_empty());
        assert!(!args.dont_print);
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&["-p", "Is tea better than coffee?", "-r", "3", "-m", "0", "-d", "-a", "-vv"]);
        assert_eq!(args.problem(), "Is tea better than coffee?");
        assert_eq!(args.rounds, Some(3));
        assert_eq!(args.moderation_interval, Some(0));
        assert!(args.dont_print);
        assert!(args.allow_speaking_twice);
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_repeated_agents() {
        let args = parse(&["--agent", "socrates", "--agent", "nietzsche"]);
        assert_eq!(args.agents, vec!["socrates", "nietzsche"]);
    }

    #[test]
    fn test_apply_overrides_config() {
        let args = parse(&["--gpt4", "-t", "0.9", "-r", "2", "-a", "--agents-file", "mine.json"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.debate.model, ModelId::Gpt4);
        assert_eq!(config.debate.temperature, 0.9);
        assert_eq!(config.debate.rounds, 2);
        assert!(config.debate.allow_speaking_twice);
        assert_eq!(config.paths.agents_file, PathBuf::from("mine.json"));
        assert_eq!(config.debate.moderation_interval, 4);
    }

    #[test]
    fn test_validate() {
        assert!(parse(&["-t", "3.5"]).validate().is_err());
        assert!(parse(&["-p", "  "]).validate().is_err());
        assert!(parse(&["-t", "0.2"]).validate().is_ok());
    }

    #[test]
    fn test_log_directive() {
        assert_eq!(Verbosity::Normal.log_directive(), "roundtable=warn");
        assert_eq!(parse(&["-vvv"]).verbosity().log_directive(), "roundtable=trace");
    }
}
