//! Orbit CLI
//!
//! Main entry point for the orbit command-line tool.
//! Ingests documents into the knowledge base and answers questions from it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, StatsCommand, StatusCommand};
use orbit_core::{config::AppConfig, logging, AppResult};
use std::future::Future;
use std::path::PathBuf;
use tracing::Instrument;

/// Orbit - the AI assistant for CollabCircle
#[derive(Parser, Debug)]
#[command(name = "orbit")]
#[command(about = "Answer questions from your documents with retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ORBIT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ORBIT_CONFIG")]
    config: Option<PathBuf>,

    /// Vector index directory
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show whether the knowledge base is loaded
    #[command(alias = "init")]
    Status(StatusCommand),

    /// Add documents to the knowledge base
    Ingest(IngestCommand),

    /// Ask Orbit a question
    Ask(AskCommand),

    /// Show knowledge base statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // .env must be loaded before clap reads ORBIT_* variables
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Flags win over ORBIT_WORKSPACE / ORBIT_CONFIG while loading
    let workspace = cli.workspace.clone();
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match key {
        "ORBIT_WORKSPACE" => workspace
            .as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| std::env::var(key).ok()),
        "ORBIT_CONFIG" => config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| std::env::var(key).ok()),
        _ => std::env::var(key).ok(),
    })?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.index,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index: {:?}", config.index_path());
    tracing::debug!("LLM: {}/{}", config.llm.provider, config.llm.model);

    let command_name = match &cli.command {
        Commands::Status(_) => "status",
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
    };

    // Route to command handlers
    let result = in_command_span(command_name, async move {
        match cli.command {
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Ingest(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config).await,
        }
    })
    .await;

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) if e.is_recoverable() => tracing::warn!("Command failed: {}", e),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

/// Run a command future inside the `command` span.
async fn in_command_span<F: Future>(name: &'static str, command: F) -> F::Output {
    command
        .instrument(tracing::info_span!("command", name = name))
        .await
}
