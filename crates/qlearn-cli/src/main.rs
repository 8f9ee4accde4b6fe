//! QLearn CLI - Command line driver for the Q-learning agent
//!
//! Inspects stored policy tables and runs the built-in corridor environment.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod settings;

use commands::{corridor, inspect};
use settings::Settings;

#[derive(Parser)]
#[command(name = "qlearn")]
#[command(author, version, about = "QLearn - greedy tabular Q-learning agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding stored tables (overrides settings)
    #[arg(short, long, global = true, env = "QLEARN_DIR")]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a stored policy table
    Inspect(inspect::InspectArgs),

    /// Train an agent in the built-in corridor environment
    Corridor(corridor::CorridorArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    if cli.verbose {
        settings.agent.verbose = true;
        settings.log.level = "debug".to_string();
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("qlearn={0},qlearn_cli={0}", settings.log.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dir = cli.dir.unwrap_or_else(|| settings.storage.dir.clone());

    match cli.command {
        Commands::Inspect(args) => inspect::run(args, &dir).await,
        Commands::Corridor(args) => corridor::run(args, &settings.agent, &dir).await,
    }
}
