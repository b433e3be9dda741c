// Haven - Crisis and mental-state detection engine
// Main entry point

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use haven::config::{load_config, Config};
use haven::crisis::{
    CrisisDetector, CrisisEngine, LexicalSentiment, NoSentiment, ResourceDirectory, RuleSet,
    SentimentAnalyzer, UserContext,
};
use haven::errors::{file_not_found_error, rules_file_error, UserFriendlyError};
use haven::metrics::{DetectionLog, DetectionMetrics};
use haven::server::CrisisServer;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "haven")]
#[command(about = "Crisis and mental-state detection for wellness chat", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Score a single message (reads stdin when no message is given)
    Detect {
        /// Message text
        message: Option<String>,
        /// JSON file with the user's context (crisis history, mood entries, ...)
        #[arg(long)]
        context: Option<PathBuf>,
        /// ISO country code for the resource list
        #[arg(long)]
        country: Option<String>,
        /// Skip the sentiment step
        #[arg(long = "no-sentiment")]
        no_sentiment: bool,
        /// Print the full assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// List crisis resources for a country
    Resources {
        #[arg(long)]
        country: Option<String>,
        /// Only resources with this specialty (e.g. "suicide", "youth")
        #[arg(long)]
        specialty: Option<String>,
    },
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Summarize the detection log
    Summary,
    /// Print the active rule tables as JSON
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();

    let config = load_config()?;

    match args.command {
        Command::Detect {
            message,
            context,
            country,
            no_sentiment,
            json,
        } => run_detect(&config, message, context, country, no_sentiment, json),
        Command::Resources { country, specialty } => {
            run_resources(&config, country.as_deref(), specialty.as_deref())
        }
        Command::Serve { bind } => run_serve(config, bind).await,
        Command::Summary => run_summary(&config),
        Command::Rules => run_rules(&config),
    }
}

/// Initialize tracing on stderr so stdout stays clean for command output
///
/// Default level is INFO, overridable with RUST_LOG. HAVEN_DEBUG=1 forces debug.
fn init_tracing() {
    let show_debug = std::env::var("HAVEN_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let env_filter = if show_debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(show_debug);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
}

fn sentiment_for(config: &Config, no_sentiment: bool) -> Arc<dyn SentimentAnalyzer> {
    if config.detection.sentiment_enabled && !no_sentiment {
        Arc::new(LexicalSentiment)
    } else {
        Arc::new(NoSentiment)
    }
}

/// Detector from config: custom rule tables when rules_path is set
fn build_detector(config: &Config, no_sentiment: bool) -> Result<CrisisDetector> {
    let sentiment = sentiment_for(config, no_sentiment);
    match &config.detection.rules_path {
        Some(path) => CrisisDetector::load_from_file(path, sentiment).map_err(|e| {
            anyhow!(rules_file_error(
                &path.display().to_string(),
                &format!("{:#}", e)
            ))
        }),
        None => Ok(CrisisDetector::new(RuleSet::builtin(), sentiment)?),
    }
}

fn build_directory(config: &Config) -> Result<ResourceDirectory> {
    match &config.resources.resources_path {
        Some(path) => ResourceDirectory::load_from_file(path).user_context_with_suggestion(
            "Failed to load crisis resources",
            "Remove resources_path from [resources] to use the built-in directory",
        ),
        None => Ok(ResourceDirectory::builtin()),
    }
}

fn build_engine(config: &Config, no_sentiment: bool) -> Result<CrisisEngine> {
    Ok(CrisisEngine::new(
        build_detector(config, no_sentiment)?,
        build_directory(config)?,
        config.resources.default_country.clone(),
    ))
}

fn read_context(path: &Path) -> Result<UserContext> {
    if !path.exists() {
        anyhow::bail!(file_not_found_error(
            &path.display().to_string(),
            "Context file"
        ));
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let context: UserContext = serde_json::from_str(&contents).with_context(|| {
        format!(
            "Context file {} must be a JSON object with UserContext fields",
            path.display()
        )
    })?;
    context.validate()?;
    Ok(context)
}

fn run_detect(
    config: &Config,
    message: Option<String>,
    context: Option<PathBuf>,
    country: Option<String>,
    no_sentiment: bool,
    json: bool,
) -> Result<()> {
    let message = match message {
        Some(message) => message,
        None if !io::stdin().is_terminal() => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            input.trim().to_string()
        }
        None => anyhow::bail!("No message given. Pass it as an argument or pipe it on stdin."),
    };

    let context = context.as_deref().map(read_context).transpose()?;
    let engine = build_engine(config, no_sentiment)?;
    let assessment = engine.assess(&message, context.as_ref(), country.as_deref(), &[]);

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    if let Some(detection) = &assessment.detection {
        println!(
            "Level: {} (score {:.3}, confidence {:.2})",
            detection.level, detection.risk_score, detection.confidence
        );
        println!("Action: {}", detection.recommended_action.as_str());
        if !detection.factors.is_empty() {
            println!("Factors: {}", detection.factors.join(", "));
        }
        if detection.immediate_risk {
            println!("Immediate risk: yes");
        }
    }

    if let Some(reply) = &assessment.reply {
        println!("\n{}", reply);
    }

    Ok(())
}

fn run_resources(config: &Config, country: Option<&str>, specialty: Option<&str>) -> Result<()> {
    let directory = build_directory(config)?;
    let country = country.unwrap_or(&config.resources.default_country);

    let resources = match specialty {
        Some(specialty) => directory.by_specialty(country, specialty),
        None => directory.for_country(country),
    };

    if resources.is_empty() {
        println!("No crisis resources found for {}", country);
        return Ok(());
    }

    for resource in resources {
        println!("{} [{}]", resource.name, resource.country);
        if !resource.phone_number.is_empty() {
            println!("  Phone: {}", resource.phone_number);
        }
        if let Some(text) = &resource.text_number {
            println!("  Text: {}", text);
        }
        if let Some(website) = &resource.website {
            println!("  Web: {}", website);
        }
        println!("  {}", resource.description);
    }

    Ok(())
}

async fn run_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let engine = build_engine(&config, false)?;
    let detection_log = DetectionLog::open(&config.storage.data_dir)
        .user_context("Could not open the detection log (check [storage] data_dir)")?;
    let metrics = DetectionMetrics::new()?;

    tracing::info!(
        bind = %config.server.bind_address,
        sentiment = engine.detector().sentiment_name(),
        resources = engine.directory().len(),
        auth_enabled = config.server.auth_enabled,
        "Starting Haven"
    );

    if config.server.auth_enabled && config.server.api_keys.is_empty() {
        tracing::warn!("Authentication is enabled but no API keys are configured");
    }

    CrisisServer::new(&config, engine, detection_log, metrics)
        .serve()
        .await
}

fn run_summary(config: &Config) -> Result<()> {
    let log = DetectionLog::open(&config.storage.data_dir)?;
    let summary = log.summary();

    println!("Detection log: {}", log.path().display());
    println!("Total detections: {}", summary.total);
    for (level, count) in &summary.by_level {
        println!("  {:<10} {}", level.as_str(), count);
    }
    println!("With feedback: {}", summary.with_feedback);
    println!("False positives: {}", summary.false_positives);

    Ok(())
}

fn run_rules(config: &Config) -> Result<()> {
    let detector = build_detector(config, true)?;
    println!("{}", serde_json::to_string_pretty(detector.rules())?);
    Ok(())
}
