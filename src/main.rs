//! # Main Entry Point
//!
//! Wires the layers together:
//! - Domain: Configuration and Types
//! - Infrastructure: Chat REST gateway, Generation client
//! - Application: Key pool, Generator, Dispatcher, Workers, Supervisor

mod application;
mod domain;
mod infrastructure;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use crate::application::generator::ReplyGenerator;
use crate::application::keys::KeyPool;
use crate::application::supervisor::Supervisor;
use crate::domain::config::{self, AppConfig};
use crate::domain::traits::ChatGateway;
use crate::infrastructure::discord::DiscordGateway;
use crate::infrastructure::gemini::GeminiClient;

#[derive(Parser, Debug)]
#[command(name = "rejoinder", about = "Multi-channel automated reply agent")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&args.config)?;

    // 2. Logging Setup
    if !std::path::Path::new("data").exists() {
        fs::create_dir("data").context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = std::path::Path::new("data/session.log");
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }

    let file_appender = tracing_appender::rolling::never("data", "session.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting rejoinder...");

    // 3. Secrets and Channel List
    let tokens = config::env_list(&config.chat.tokens_env)
        .context("No chat account tokens available")?;
    let keys = config::env_list(&config.generation.keys_env)
        .context("No generation API keys available")?;
    let channel_ids = config::load_channel_ids(&config.channels.list_file)?;
    tracing::info!(
        "Loaded {} chat tokens, {} generation keys, {} channels",
        tokens.len(),
        keys.len(),
        channel_ids.len()
    );

    // 4. Service Clients
    let gateways: Vec<Arc<dyn ChatGateway>> = tokens
        .iter()
        .map(|token| {
            Arc::new(DiscordGateway::new(&config.chat.api_base, token)) as Arc<dyn ChatGateway>
        })
        .collect();
    let pool = Arc::new(KeyPool::new(
        keys,
        Duration::from_secs(config.generation.cooldown_seconds),
    ));
    let backend = Arc::new(GeminiClient::new(
        &config.generation.api_base,
        &config.generation.model,
    ));
    let generator = Arc::new(ReplyGenerator::new(
        backend,
        pool,
        config.channels.corpus_file.clone(),
    ));

    // 5. Run Until Interrupted
    Supervisor::new(config, channel_ids, gateways, generator)
        .run()
        .await
}
