//! visreg CLI - Main Entry Point
//!
//! Command-line interface for running visual regression checks and
//! maintaining their baselines.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{baseline, clean, list, run};

/// visreg - Playwright-driven visual regression checks
#[derive(Parser)]
#[command(name = "visreg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run visual regression checks
    Run(run::RunArgs),

    /// List scenarios and their baseline status
    List(list::ListArgs),

    /// Baseline maintenance
    #[command(subcommand)]
    Baseline(baseline::BaselineCommands),

    /// Remove retained diff artifacts
    Clean(clean::CleanArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let outcome = match cli.command {
        Commands::Run(args) => run::execute(args, cli.format).await,
        Commands::List(args) => list::execute(args, cli.format),
        Commands::Baseline(command) => baseline::execute(command),
        Commands::Clean(args) => clean::execute(args),
    };

    // Exit 0 when everything passed, 1 on check failures, 2 on runner errors
    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}
