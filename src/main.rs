//! Roundtable - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use roundtable::{
    cli::Args,
    config::Config,
    context::{HfTokenizer, TokenCounter},
    debate::{JsonFileSink, TurnScheduler},
    display::{ConsoleObserver, DebateObserver},
    registry::AgentRegistry,
    streaming::{CallLog, InferenceSession, OpenAiClient},
    telemetry::{init_tracing, ObserverSet, TelemetryCollector},
    AgentPipeline,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    if let Err(e) = args.validate() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(2);
    }

    run_debate(&args).await
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply(&mut config);
    Ok(config)
}

fn token_counter(config: &Config) -> Result<TokenCounter> {
    match &config.paths.tokenizer {
        Some(path) => {
            let tokenizer = HfTokenizer::from_file(path)?;
            info!(path = %path.display(), "using HuggingFace tokenizer");
            Ok(TokenCounter::new(Arc::new(tokenizer)))
        }
        None => Ok(TokenCounter::heuristic()),
    }
}

async fn run_debate(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    debug!(?config, "configuration loaded");

    let api_key = config.api_key()?;

    let registry = AgentRegistry::load(&config.paths.agents_file)?;
    let agents = registry.select(&args.agents)?;

    let client = OpenAiClient::with_config(&config.openai.api_base, api_key)
        .context("Failed to create API client")?;

    let call_log = config.paths.call_log.as_ref().map(CallLog::new);
    let session = InferenceSession::new(Arc::new(client), token_counter(&config)?).with_call_log(call_log);

    let debate_id = Uuid::new_v4().to_string();
    let pipeline = AgentPipeline::new(session, config.debate.model, config.debate.temperature, args.problem())
        .with_correlation_id(debate_id.as_str());

    info!(
        debate = %debate_id,
        model = %config.debate.model,
        agents = agents.len(),
        rounds = config.debate.rounds,
        "starting debate"
    );

    let telemetry = Arc::new(TelemetryCollector::new());
    let mut observers = ObserverSet::new().with(telemetry.clone());
    if !args.dont_print {
        observers = observers.with(Arc::new(ConsoleObserver::new()));
    }
    let observer: Arc<dyn DebateObserver> = Arc::new(observers);

    let mut scheduler = TurnScheduler::new(pipeline, agents, config.debate.settings())?.with_observer(observer);

    if let Some(comments) = &config.debate.moderator_comments {
        scheduler = scheduler.with_moderator_comments(comments.clone());
    }
    if let Some(seed) = args.seed {
        scheduler = scheduler.with_seed(seed);
    }
    if let Some(path) = &args.output {
        scheduler = scheduler.with_sink(Box::new(JsonFileSink::new(path)));
    }

    scheduler.run().await?;

    if !args.dont_print {
        println!("\n{}", scheduler.usage().render_report(true, None));
        println!("{}", telemetry.summary());
        if let Some(path) = &args.output {
            println!("Debate written to {}", path.display().to_string().cyan());
        }
        println!("{}", "Debate complete!".green().bold());
    }

    Ok(())
}
