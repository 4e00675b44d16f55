//! Sluice CLI - Command-line interface for sluice pipelines.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(author, version, about = "Sluice demand-driven pipeline CLI", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a pipeline file and update it
    Run(commands::run::RunArgs),

    /// List available node types and their parameters
    Nodes(commands::nodes::NodesArgs),

    /// Show how an extent splits into pieces
    Split(commands::split::SplitArgs),

    /// Resolve a requested time against time steps
    Resolve(commands::resolve::ResolveArgs),

    /// Check a pipeline file without running it
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Nodes(args) => commands::nodes::run(args),
        Commands::Split(args) => commands::split::run(args),
        Commands::Resolve(args) => commands::resolve::run(args),
        Commands::Validate(args) => commands::validate::run(args),
    }
}
