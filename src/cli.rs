use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schemaforge")]
#[command(author, version, about = "Ledger-tracked database schema migrations")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply all pending migrations
    Upgrade {
        /// List pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which migrations are applied and which are pending
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record all pending migrations as applied without running them
    MarkCompleted,

    /// Validate configuration file and migration directory
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Where to write the config
        #[arg(default_value = "schemaforge.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}
