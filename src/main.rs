mod cli;
mod config;
mod db;
mod memory;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "retrospect",
    version,
    about = "Lessons-learned memory engine for software-delivery agents"
)]
struct Cli {
    /// Override the configured database path
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a lesson
    Add(cli::add::AddArgs),
    /// List stored lessons for a scope
    List(cli::list::ListArgs),
    /// Rank lessons for a retrieval context
    Retrieve(cli::retrieve::RetrieveArgs),
    /// Record a ticket transition and its lesson in one atomic write
    Finish(cli::finish::FinishArgs),
    /// List workflow audit records
    Audit(cli::audit::AuditArgs),
    /// Compose an artifact with injected lessons
    Compose {
        #[command(subcommand)]
        target: cli::compose::ComposeTarget,
    },
    /// Aggregate project insights
    Stats(cli::stats::StatsArgs),
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = config::RetrospectConfig::load()?;
    if let Some(db_path) = args.db {
        config.storage.db_path = db_path;
    }

    // Log to stderr so stdout stays clean for piped JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Add(args) => cli::add::add(&config, &args),
        Command::List(args) => cli::list::list(&config, &args),
        Command::Retrieve(args) => cli::retrieve::retrieve(&config, &args),
        Command::Finish(args) => cli::finish::finish(&config, &args),
        Command::Audit(args) => cli::audit::audit(&config, &args),
        Command::Compose { target } => cli::compose::compose(&config, &target),
        Command::Stats(args) => cli::stats::stats(&config, &args),
    }
}
