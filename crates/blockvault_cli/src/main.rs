//! BlockVault CLI
//!
//! Command-line tools for inspecting and exporting vault files.
//!
//! # Commands
//!
//! - `status` - Show the derived watermark and record counts
//! - `blocks` - List stored block records
//! - `export` - Run the resync protocol into a local directory
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// BlockVault command-line vault tools.
#[derive(Parser)]
#[command(name = "blockvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the vault file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the derived watermark and record counts
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List stored block records
    Blocks {
        /// Maximum number of records to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run the resync protocol, writing payloads into a directory
    Export {
        /// Hex-encoded id of the last block the follower holds
        #[arg(short, long)]
        ancestor: Option<String>,

        /// Output directory for snapshot and block payloads
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status { format } => {
            let path = cli.path.ok_or("Vault path required for status")?;
            commands::status::run(&path, &format)?;
        }
        Commands::Blocks { limit } => {
            let path = cli.path.ok_or("Vault path required for blocks")?;
            commands::blocks::run(&path, limit)?;
        }
        Commands::Export { ancestor, out } => {
            let path = cli.path.ok_or("Vault path required for export")?;
            commands::export::run(&path, ancestor.as_deref(), &out)?;
        }
        Commands::Version => {
            println!("BlockVault CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
