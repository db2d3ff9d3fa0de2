//! Wiring CLI
//!
//! Command-line tools for exercising wiring tables and their history.
//!
//! # Commands
//!
//! - `demo` - Build a small circuit, optionally undo part of it, dump the history
//! - `stress` - Run concurrent writers and verify a full undo round trip
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Wiring command-line tools.
#[derive(Parser)]
#[command(name = "wiring")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session and dump the resulting history
    Demo {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Undo this many of the most recent events before dumping
        #[arg(short, long, default_value = "0")]
        undo: usize,
    },

    /// Run concurrent writers and verify a full undo round trip
    Stress {
        /// Number of writer threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Operations per thread
        #[arg(short, long, default_value = "1000")]
        ops: usize,
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
        Commands::Demo { format, undo } => {
            commands::demo::run(&format, undo)?;
        }
        Commands::Stress { threads, ops } => {
            if threads == 0 {
                return Err("at least one thread required".into());
            }
            commands::stress::run(threads, ops)?;
        }
        Commands::Version => {
            println!("Wiring CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Wiring Core v{}", wiring_core::VERSION);
        }
    }

    Ok(())
}
