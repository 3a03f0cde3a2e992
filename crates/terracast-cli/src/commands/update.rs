//! `pricing update` command.

use std::io::BufRead;

use anyhow::{bail, Context, Result};

use terracast_ingest::{run, IngestConfig, IngestRequest, MemoryStaging, StreamingStaging};
use terracast_storage::{MemoryStore, StoreSettings};

use crate::cli::{OutputFormat, UpdateArgs};
use crate::output::print_report;
use crate::source::CatalogFile;

/// Executes `pricing update`.
pub fn execute(args: UpdateArgs, format: OutputFormat) -> Result<()> {
    confirm_production(&args)?;

    let catalog = CatalogFile::load(&args.catalog_file)?;
    let regions: Vec<String> = if args.region == "all" {
        catalog.region_names()
    } else {
        vec![args.region.clone()]
    };
    if regions.is_empty() {
        bail!("catalog file contains no regions");
    }

    // Deployments link a real backend behind the PricingStore trait;
    // this binary ships with the in-process store, so the run's
    // durable artifact is the backup file.
    if !args.dry_run {
        match StoreSettings::from_env() {
            Ok(_) => tracing::info!(
                "store settings present; this build links no database backend, \
                 committing to the in-process store"
            ),
            Err(_) => tracing::warn!(
                "no store settings in the environment; committing to the in-process store"
            ),
        }
    }

    let store = MemoryStore::new();
    for region in regions {
        let source = catalog
            .source_for(&region)
            .with_context(|| format!("region {region} not present in the catalog file"))?;

        let request = IngestRequest {
            provider: args.provider.clone(),
            region: region.clone(),
            alias: args.alias.clone(),
            source_id: args.catalog_file.display().to_string(),
        };
        let config = IngestConfig {
            backup_dir: args.backup_dir.clone(),
            parallel_fetches: args.parallel,
            dry_run: args.dry_run,
            ..IngestConfig::default()
        };

        let report = if args.streaming {
            let mut staging = StreamingStaging::open(&args.staging_dir.join(&region))
                .context("cannot open staging directory")?;
            run(&request, &source, &store, &mut staging, &config)
        } else {
            run(&request, &source, &store, &mut MemoryStaging::new(), &config)
        }
        .with_context(|| format!("update failed for {region}"))?;

        let scope = format!("{}/{}/{}", args.provider, region, args.alias);
        print_report(&scope, &report, format);
    }
    Ok(())
}

/// Production without --dry-run requires a literal `yes` on stdin
/// unless --confirm was given.
fn confirm_production(args: &UpdateArgs) -> Result<()> {
    if args.environment != "production" || args.dry_run || args.confirm {
        return Ok(());
    }
    eprintln!(
        "About to update production pricing for {}/{}/{}.",
        args.provider, args.region, args.alias
    );
    eprint!("Type 'yes' to continue: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("cannot read confirmation")?;
    if line.trim() != "yes" {
        bail!("aborted: production update not confirmed");
    }
    Ok(())
}
