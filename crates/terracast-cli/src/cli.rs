//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Terracast - pricing snapshot operations
#[derive(Parser)]
#[command(name = "terracast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pricing snapshot operations
    Pricing(PricingArgs),
}

/// Arguments for the pricing command group.
#[derive(Args)]
pub struct PricingArgs {
    #[command(subcommand)]
    pub command: PricingCommand,
}

/// Pricing subcommands
#[derive(Subcommand)]
pub enum PricingCommand {
    /// Ingest a provider catalog into a new pricing snapshot
    Update(UpdateArgs),

    /// Re-commit a snapshot from a backup file
    Restore(RestoreArgs),
}

/// Arguments for `pricing update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Cloud provider (e.g. aws)
    #[arg(long)]
    pub provider: String,

    /// Region to ingest, or `all` for every region in the catalog
    #[arg(long)]
    pub region: String,

    /// Provider alias the snapshot is for
    #[arg(long)]
    pub alias: String,

    /// Target environment (production requires confirmation)
    #[arg(long)]
    pub environment: String,

    /// Bulk catalog file (JSON, regions -> entries)
    #[arg(long)]
    pub catalog_file: PathBuf,

    /// Directory backups are written into
    #[arg(long, default_value = "./pricing-backups")]
    pub backup_dir: PathBuf,

    /// Stop after the backup; write nothing to the store
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the production confirmation prompt
    #[arg(long)]
    pub confirm: bool,

    /// Use the low-memory streaming staging strategy
    #[arg(long)]
    pub streaming: bool,

    /// Staging spill directory for --streaming
    #[arg(long, default_value = "./pricing-staging")]
    pub staging_dir: PathBuf,

    /// Parallel service fetches (1-4)
    #[arg(long, default_value_t = 2)]
    pub parallel: usize,
}

/// Arguments for `pricing restore`.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// The backup file to restore
    pub backup_file: PathBuf,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable key/value output
    #[default]
    Table,
    /// JSON report
    Json,
}
