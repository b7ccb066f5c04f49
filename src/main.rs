//! Main entry point for the Opus Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opus_translator::cli::commands::{self, Commands};
use opus_translator::ServiceConfig;

/// Opus Translator - German/English machine translation service
#[derive(Parser, Debug)]
#[command(name = "opus-translator", version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum concurrently translated sentences
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("opus_translator={},tower_http={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServiceConfig::load(args.config.as_deref())?;

    // Override config with CLI args if provided
    if let Some(max_workers) = args.max_workers {
        config.pipeline.max_workers = max_workers;
        config.validate()?;
    }

    // Execute command
    match args.command {
        Some(Commands::Serve { host, port }) => {
            commands::handle_serve(config, host, port).await?;
        }
        Some(Commands::Translate {
            direction,
            device,
            text,
            file,
            output,
        }) => {
            commands::handle_translate(config, direction, device, text, file, output).await?;
        }
        Some(Commands::InstallModels { direction }) => {
            commands::handle_install_models(config, direction).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
