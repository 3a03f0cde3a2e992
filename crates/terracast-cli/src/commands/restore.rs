//! `pricing restore` command.

use anyhow::{Context, Result};

use terracast_ingest::restore;
use terracast_storage::MemoryStore;

use crate::cli::{OutputFormat, RestoreArgs};
use crate::output::print_report;

/// Executes `pricing restore <backup-file>`.
pub fn execute(args: RestoreArgs, format: OutputFormat) -> Result<()> {
    let store = MemoryStore::new();
    let report = restore(&args.backup_file, &store, "restore")
        .with_context(|| format!("restore failed for {}", args.backup_file.display()))?;

    let scope = args.backup_file.display().to_string();
    print_report(&scope, &report, format);
    Ok(())
}
