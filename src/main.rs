//! Token Signal Bot
//!
//! Consumes token alerts from a Redis stream, scores them per channel and
//! forwards the ones that qualify to Telegram.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use token_signal_bot::{
    config::Config,
    decision::DecisionEngine,
    notify::Notifier,
    parser,
    pipeline::AlertPipeline,
    storage::{RedisTokenCache, TokenArchive},
    stream::{AlertEnvelope, RedisStreamLog, StreamProcessor},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "token-signal-bot")]
#[command(about = "Filters social-feed token alerts into actionable notifications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path, defaults to ./config.toml or ~/.config/token-signal-bot/config.toml
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume the alert stream until Ctrl-C
    Run,
    /// Print the fields extracted from an alert text file
    Parse {
        /// File holding the raw alert text
        file: PathBuf,
    },
    /// Append a raw alert to the stream
    Publish {
        /// Channel tag of the source feed
        #[arg(long)]
        channel: String,
        /// Sub-topic tag, if the feed has one
        #[arg(long, default_value = "")]
        child: String,
        /// File holding the raw alert text
        file: PathBuf,
    },
    /// Show recently alerted tokens from the archive
    History {
        /// Number of tokens to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file } => parse_file(&file),
        Commands::Run => run_pipeline(load_config(cli.config.as_deref())?).await,
        Commands::Publish { channel, child, file } => {
            publish(load_config(cli.config.as_deref())?, channel, child, &file).await
        }
        Commands::History { limit } => {
            show_history(load_config(cli.config.as_deref())?, limit).await
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}

async fn run_pipeline(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting token signal bot");

    let log = Arc::new(RedisStreamLog::connect(&config.redis.url).await?);
    let cache = Arc::new(RedisTokenCache::connect(&config.redis.url, config.cache.ttl_secs).await?);

    let notifier = Notifier::from_config(config.telegram.as_ref());
    if !notifier.is_enabled() {
        tracing::warn!("Telegram is not configured, alerts will only be logged");
    }

    let engine = DecisionEngine::new(config.channels.clone(), config.rules.clone());
    let mut pipeline = AlertPipeline::new(cache, engine, Arc::new(notifier));
    if let Some(db) = &config.database {
        let path = db.expanded_path();
        pipeline = pipeline.with_archive(TokenArchive::connect(&path).await?);
        tracing::info!("Archiving alerts to {}", path);
    }

    let processor = Arc::new(StreamProcessor::new(log, config.stream.clone()));
    processor.initialize().await?;
    let worker = processor.start_processing(Arc::new(pipeline))?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, finishing in-flight messages...");

    processor.stop_processing();
    worker.await?;

    let stats = processor.stats();
    tracing::info!(
        "Processed {} messages: {} acked, {} dead-lettered, {} read errors, {} settle errors",
        stats.received,
        stats.acknowledged,
        stats.dead_lettered,
        stats.read_errors,
        stats.settle_errors
    );

    processor.close().await?;
    Ok(())
}

fn parse_file(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)?;
    let fields = parser::extract(&text);
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

async fn publish(config: Config, channel: String, child: String, file: &Path) -> anyhow::Result<()> {
    let payload = std::fs::read_to_string(file)?;
    let log = Arc::new(RedisStreamLog::connect(&config.redis.url).await?);
    let processor = StreamProcessor::new(log, config.stream);

    let id = processor
        .add_message(&AlertEnvelope::new(channel, child, payload))
        .await?;
    println!("Published {} to {}", id, processor.config().key);

    processor.close().await?;
    Ok(())
}

async fn show_history(config: Config, limit: i64) -> anyhow::Result<()> {
    let Some(db) = &config.database else {
        anyhow::bail!("No [database] section configured");
    };
    let archive = TokenArchive::connect(db.expanded_path()).await?;
    let tokens = archive.recent(limit).await?;

    println!("\n📊 Last {} alerted tokens:\n", tokens.len());
    println!(
        "{:<12} {:<46} {:<14} {:>6} {:>20}",
        "Symbol", "Contract", "Channel", "Alerts", "Updated"
    );
    println!("{}", "-".repeat(102));

    for token in tokens {
        let symbol: String = token.symbol.chars().take(12).collect();
        println!(
            "{:<12} {:<46} {:<14} {:>6} {:>20}",
            symbol,
            token.ca,
            token.channel,
            token.alert,
            token.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}
