//! Virtual TA CLI
//!
//! Main entry point for the `vta` command-line tool: serves the answer API
//! and manages the course and forum content behind it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CleanCommand, CourseCommand, GetCommand, ScrapeCommand, ServeCommand, StatsCommand,
};
use std::path::PathBuf;
use vta_core::{config::AppConfig, logging, AppResult};

/// Virtual TA - answers course questions from course material and forum posts
#[derive(Parser, Debug)]
#[command(name = "vta")]
#[command(about = "Virtual teaching assistant over course and forum content", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "VTA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "VTA_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite record store
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// LLM provider for answer synthesis (none, openai, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP answer service
    Serve(ServeCommand),

    /// Ingest forum posts into the record store
    Scrape(ScrapeCommand),

    /// Course material management
    Course(CourseCommand),

    /// Answer a question from the command line
    Ask(AskCommand),

    /// Print a stored record
    Get(GetCommand),

    /// Show record store statistics
    Stats(StatsCommand),

    /// Remove stored records
    Clean(CleanCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Serve(_) => "serve",
            Commands::Scrape(_) => "scrape",
            Commands::Course(_) => "course",
            Commands::Ask(_) => "ask",
            Commands::Get(_) => "get",
            Commands::Stats(_) => "stats",
            Commands::Clean(_) => "clean",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, then config file, then environment
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.database,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Store: {:?}", config.database_path());
    tracing::debug!("Provider: {} (model: {})", config.provider, config.model);

    config.validate()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(config).await,
        Commands::Scrape(cmd) => cmd.execute(&config).await,
        Commands::Course(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Get(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) if e.is_client_error() => tracing::warn!("{}", e),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
