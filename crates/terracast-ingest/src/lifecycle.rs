//! The seven-phase ingestion lifecycle.

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{info, warn};

use terracast_pricing::{PricingSnapshot, SnapshotBuilder};
use terracast_storage::PricingStore;

use crate::backup::{write_backup, BackupFile};
use crate::error::{IngestError, IngestFailure, IngestResult};
use crate::fetch::{fetch_all, CatalogSource};
use crate::normalize::{normalize_service, NormalizedRate};
use crate::phase::IngestPhase;
use crate::staging::Staging;
use crate::validate::{validate, ServiceContract};

// =============================================================================
// REQUEST / CONFIG / REPORT
// =============================================================================

/// Scope of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    /// Cloud provider, e.g. `aws`.
    pub provider: String,
    /// Region to ingest.
    pub region: String,
    /// Provider alias the snapshot is for.
    pub alias: String,
    /// Source identifier recorded on the snapshot.
    pub source_id: String,
}

/// Lifecycle tuning.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory backups are written into.
    pub backup_dir: PathBuf,
    /// Per-service governance contracts.
    pub contracts: Vec<ServiceContract>,
    /// Optional (baseline rate count, minimum coverage) floor.
    pub coverage: Option<(usize, f64)>,
    /// Parallel service fetches (clamped to 1..=4).
    pub parallel_fetches: usize,
    /// When set, stop after the backup: no store writes.
    pub dry_run: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("./pricing-backups"),
            contracts: ServiceContract::aws_defaults(),
            coverage: None,
            parallel_fetches: 2,
            dry_run: false,
        }
    }
}

/// What one lifecycle run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// The phase the run ended in (`Active`, or `BackedUp` for a
    /// dry-run).
    pub phase: IngestPhase,
    /// Committed (or reused) snapshot id; `None` for dry runs.
    pub snapshot_id: Option<String>,
    /// Content hash of the staged snapshot.
    pub content_hash: String,
    /// Rates staged.
    pub rate_count: usize,
    /// Entries skipped during normalization.
    pub skipped_entries: usize,
    /// Path of the backup written for this run.
    pub backup_path: PathBuf,
    /// True when an identical active snapshot already existed and was
    /// returned instead of a new commit.
    pub reused_existing: bool,
}

// =============================================================================
// THE LIFECYCLE
// =============================================================================

/// Runs the full lifecycle for one (provider, region, alias).
///
/// Failures return an [`IngestFailure`] naming the phase. No store
/// mutation happens before the backup is on disk.
pub fn run(
    request: &IngestRequest,
    source: &dyn CatalogSource,
    store: &dyn PricingStore,
    staging: &mut dyn Staging,
    config: &IngestConfig,
) -> Result<IngestReport, IngestFailure> {
    let mut phase = IngestPhase::Fetching;
    info!(
        provider = %request.provider,
        region = %request.region,
        alias = %request.alias,
        "ingestion started"
    );

    // Fetching: the complete catalog, minus services a resumed
    // checkpoint already staged.
    let already_staged = staging.completed_services();
    let services: Vec<String> = source
        .services()
        .into_iter()
        .filter(|s| !already_staged.contains(s))
        .collect();
    let fetched = fetch_all(source, &services, config.parallel_fetches)
        .map_err(|e| IngestFailure::at(phase, e))?;

    // Normalizing.
    phase = IngestPhase::Normalizing;
    let mut skipped_entries = 0;
    let mut normalized: BTreeMap<String, Vec<NormalizedRate>> = BTreeMap::new();
    for (service, entries) in &fetched {
        let (rates, skipped) =
            normalize_service(&request.provider, &request.region, &request.alias, entries);
        skipped_entries += skipped;
        normalized.insert(service.clone(), rates);
    }
    if skipped_entries > 0 {
        warn!(skipped = skipped_entries, "entries skipped during normalization");
    }

    // Validating: the union of resumed and freshly normalized rates
    // must satisfy the governance contracts.
    phase = IngestPhase::Validating;
    let resumed = staging.collect().map_err(|e| IngestFailure::at(phase, e))?;
    let mut union = resumed;
    for (service, rates) in &normalized {
        union.insert(service.clone(), rates.clone());
    }
    validate(&union, &config.contracts, config.coverage)
        .map_err(|e| IngestFailure::at(phase, e))?;

    // Staging: spill the new services, then build the snapshot view
    // and its content hash.
    phase = IngestPhase::Staging;
    for (service, rates) in normalized {
        staging
            .stage(&service, rates)
            .map_err(|e| IngestFailure::at(phase, e))?;
    }
    let staged = union;
    let mut builder = SnapshotBuilder::new(
        &request.provider,
        &request.region,
        &request.alias,
        &request.source_id,
    );
    let mut rate_count = 0;
    for rates in staged.values() {
        for normalized_rate in rates {
            builder.add_rate(normalized_rate.key.clone(), normalized_rate.rate.clone());
            rate_count += 1;
        }
    }
    let content_hash = builder.content_hash();
    let snapshot = builder.seal();

    // BackedUp: must complete before any store write.
    phase = IngestPhase::BackedUp;
    let all_rates: Vec<NormalizedRate> = staged.into_values().flatten().collect();
    let backup = BackupFile::new(
        &request.provider,
        &request.region,
        &request.alias,
        &content_hash,
        all_rates,
        Utc::now(),
    );
    let nanos = i128::from(
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000),
    );
    let backup_path = write_backup(&config.backup_dir, &backup, nanos)
        .map_err(|e| IngestFailure::at(phase, e))?;

    if config.dry_run {
        info!(backup = %backup_path.display(), "dry run: stopping before commit");
        return Ok(IngestReport {
            phase: IngestPhase::BackedUp,
            snapshot_id: None,
            content_hash,
            rate_count,
            skipped_entries,
            backup_path,
            reused_existing: false,
        });
    }

    // Committing, idempotently: an existing snapshot with the same
    // scope and content hash is returned, not duplicated.
    phase = IngestPhase::Committing;
    let report = commit(
        store,
        &snapshot,
        &request.provider,
        &request.region,
        &request.alias,
        &content_hash,
    )
    .map_err(|e| IngestFailure::at(phase, e))?;

    staging
        .cleanup()
        .map_err(|e| IngestFailure::at(IngestPhase::Committing, e))?;

    info!(
        snapshot = report.0.as_str(),
        reused = report.1,
        rates = rate_count,
        "ingestion complete"
    );
    Ok(IngestReport {
        phase: IngestPhase::Active,
        snapshot_id: Some(report.0),
        content_hash,
        rate_count,
        skipped_entries,
        backup_path,
        reused_existing: report.1,
    })
}

/// Commits or reuses; returns (snapshot id, reused flag).
fn commit(
    store: &dyn PricingStore,
    snapshot: &PricingSnapshot,
    provider: &str,
    region: &str,
    alias: &str,
    content_hash: &str,
) -> IngestResult<(String, bool)> {
    if let Some(existing) = store.find_by_content_hash(provider, region, alias, content_hash)? {
        if existing.active {
            return Ok((existing.id.to_string(), true));
        }
    }
    let meta = store.commit_snapshot(snapshot)?;
    Ok((meta.id.to_string(), false))
}

// =============================================================================
// RESTORE
// =============================================================================

/// Re-commits a backup dump.
///
/// The file's recorded content hash must match the hash of its rates;
/// a mismatch means the dump is corrupt and nothing is written.
pub fn restore(
    backup_path: &std::path::Path,
    store: &dyn PricingStore,
    source_id: &str,
) -> Result<IngestReport, IngestFailure> {
    let phase = IngestPhase::Committing;
    let backup = crate::backup::read_backup(backup_path)
        .map_err(|e| IngestFailure::at(IngestPhase::Staging, e))?;

    let mut builder = SnapshotBuilder::new(
        &backup.provider,
        &backup.region,
        &backup.alias,
        source_id,
    );
    for rate in &backup.rates {
        builder.add_rate(rate.key.clone(), rate.rate.clone());
    }
    if builder.content_hash() != backup.content_hash {
        return Err(IngestFailure::at(
            IngestPhase::Staging,
            IngestError::CorruptBackup {
                path: backup_path.display().to_string(),
                reason: "content hash does not match rates".to_string(),
            },
        ));
    }
    let snapshot = builder.seal();

    let (snapshot_id, reused) = commit(
        store,
        &snapshot,
        &backup.provider,
        &backup.region,
        &backup.alias,
        &backup.content_hash,
    )
    .map_err(|e| IngestFailure::at(phase, e))?;

    Ok(IngestReport {
        phase: IngestPhase::Active,
        snapshot_id: Some(snapshot_id),
        content_hash: backup.content_hash,
        rate_count: backup.rates.len(),
        skipped_entries: 0,
        backup_path: backup_path.to_path_buf(),
        reused_existing: reused,
    })
}
