//! Terracast CLI - operator commands for pricing snapshots.
//!
//! # Usage
//!
//! ```bash
//! # Ingest a region from a bulk catalog file
//! terracast pricing update --provider aws --region us-east-1 \
//!     --alias default --environment staging --catalog-file offers.json
//!
//! # Every region in the catalog file
//! terracast pricing update --provider aws --region all \
//!     --alias default --environment staging --catalog-file offers.json
//!
//! # Re-commit a backup dump
//! terracast pricing restore ./pricing-backups/aws-us-east-1-default-1700000000000000000.json.gz
//! ```
//!
//! Exit code 0 on success; 1 on any phase failure, with the failing
//! phase named on stderr.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;
mod source;

use cli::{Cli, Commands, PricingCommand};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    let outcome = match cli.command {
        Commands::Pricing(pricing) => match pricing.command {
            PricingCommand::Update(args) => commands::update::execute(args, format),
            PricingCommand::Restore(args) => commands::restore::execute(args, format),
        },
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
