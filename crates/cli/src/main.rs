//! askfaq CLI
//!
//! Main entry point for the askfaq command-line tool.
//! Ingests FAQ documents into a local vector index and searches it.

mod commands;

use askfaq_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{ImportCommand, IngestCommand, RemoveCommand, SearchCommand, StatsCommand};
use std::path::PathBuf;

/// askfaq - local vector search over FAQ documents
#[derive(Parser, Debug)]
#[command(name = "askfaq")]
#[command(about = "Local vector search over FAQ documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASKFAQ_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASKFAQ_CONFIG")]
    config: Option<PathBuf>,

    /// Index name under .askfaq/index/
    #[arg(short, long, global = true, env = "ASKFAQ_INDEX")]
    index: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed chunk files into the index
    Ingest(IngestCommand),

    /// Add pre-computed embeddings
    Import(ImportCommand),

    /// Search the index
    Search(SearchCommand),

    /// Remove documents from the index
    Remove(RemoveCommand),

    /// Show index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from the selected workspace and environment
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.index,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.validate()?;

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)?;

    tracing::info!("askfaq starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index: {} (dimension {})", config.index_name, config.dimension);
    tracing::debug!(
        "Embedding: {} / {}",
        config.embedding.provider,
        config.embedding.model
    );

    config.ensure_askfaq_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Import(_) => "import",
        Commands::Search(_) => "search",
        Commands::Remove(_) => "remove",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Import(cmd) => cmd.execute(&config),
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Remove(cmd) => cmd.execute(&config),
        Commands::Stats(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
