//! # strata CLI
//!
//! Command-line interface for inspecting and resetting persisted strata
//! stores.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "strata.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter strata.yml
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// List persisted store keys
    List,

    /// Decode a persisted record and print it
    Inspect {
        /// Store key
        key: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = RecordFormat::Json)]
        format: RecordFormat,
    },

    /// Print one top-level field of a persisted store
    Get {
        /// Store key
        key: String,

        /// Field name
        field: String,
    },

    /// Delete a persisted store
    Reset {
        /// Store key
        key: String,
    },
}

#[derive(Copy, Clone, ValueEnum)]
pub enum RecordFormat {
    Json,
    Yaml,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::List => commands::list_stores(&cli.config),
        Commands::Inspect { key, format } => commands::inspect_store(&cli.config, &key, format),
        Commands::Get { key, field } => commands::get_field(&cli.config, &key, &field),
        Commands::Reset { key } => commands::reset_store(&cli.config, &key),
    }
}
