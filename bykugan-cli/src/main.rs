//! Bykugan CLI
//!
//! Record a screen capture session and save it as a file.
//!
//! # Usage
//!
//! ```bash
//! # Record for ten seconds and save to the download directory
//! bykugan record --duration 10
//!
//! # Show supported encodings
//! bykugan info
//!
//! # Write a starter config file
//! bykugan config init
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Bykugan - lightweight screen recording
#[derive(Parser)]
#[command(name = "bykugan")]
#[command(version)]
#[command(about = "Lightweight screen recording sessions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the screen and save the result
    #[command(alias = "rec")]
    Record(commands::RecordArgs),

    /// Show recording support and encoding negotiation
    Info(commands::InfoArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("bykugan={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Record(args) => commands::record(args).await?,
        Commands::Info(args) => commands::info(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
