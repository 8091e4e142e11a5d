//! platformer-q CLI - Q-learning over abstracted platformer states
//!
//! This CLI provides a unified interface for:
//! - Training agents on the synthetic level
//! - Evaluating saved agents greedily
//! - Inspecting saved agents
//! - Exporting values, codebooks and configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use platformer_q::cli::commands;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "platformer-q")]
#[command(version, about = "Q-learning agent for side-scrolling platformers", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an agent on the synthetic level
    Train(Box<commands::train::TrainArgs>),

    /// Evaluate a trained agent
    Evaluate(commands::evaluate::EvaluateArgs),

    /// Show what a saved agent contains
    Inspect(commands::inspect::InspectArgs),

    /// Export data in various formats
    Export(commands::export::ExportArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Train(args) => commands::train::execute(*args),
        Commands::Evaluate(args) => commands::evaluate::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Export(args) => commands::export::execute(args),
    }
}
