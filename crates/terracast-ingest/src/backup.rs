//! Backup dumps.
//!
//! A backup is a gzipped JSON document holding everything needed to
//! rebuild a snapshot: scope, timestamp, content hash, schema version,
//! and the normalized rates. It must be on disk and synced before the
//! store sees any write; if the backup cannot be written, the
//! lifecycle aborts with the store untouched.

use chrono::{DateTime, SecondsFormat, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IngestError, IngestResult};
use crate::normalize::NormalizedRate;

/// Schema version written into every backup.
pub const BACKUP_SCHEMA_VERSION: &str = "1.0";

/// The backup file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    /// Cloud provider.
    pub provider: String,
    /// Region.
    pub region: String,
    /// Provider alias.
    pub alias: String,
    /// Backup creation time, RFC3339 UTC.
    pub timestamp: String,
    /// Hex SHA-256 content hash of the staged snapshot.
    pub content_hash: String,
    /// Backup schema version.
    pub schema_version: String,
    /// Number of rates in the dump.
    pub rate_count: usize,
    /// The normalized rates.
    pub rates: Vec<NormalizedRate>,
}

impl BackupFile {
    /// Assembles a backup document.
    #[must_use]
    pub fn new(
        provider: &str,
        region: &str,
        alias: &str,
        content_hash: &str,
        rates: Vec<NormalizedRate>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            region: region.to_string(),
            alias: alias.to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            content_hash: content_hash.to_string(),
            schema_version: BACKUP_SCHEMA_VERSION.to_string(),
            rate_count: rates.len(),
            rates,
        }
    }

    /// The conventional file name:
    /// `<provider>-<region>-<alias>-<nanos>.json.gz`.
    #[must_use]
    pub fn file_name(&self, nanos: i128) -> String {
        format!(
            "{}-{}-{}-{nanos}.json.gz",
            self.provider, self.region, self.alias
        )
    }
}

/// Writes the backup into `dir`, fsyncs it, and returns its path.
pub fn write_backup(dir: &Path, backup: &BackupFile, nanos: i128) -> IngestResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| IngestError::backup(format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(backup.file_name(nanos));

    let file = File::create(&path)
        .map_err(|e| IngestError::backup(format!("cannot create {}: {e}", path.display())))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    let json = serde_json::to_vec(backup)
        .map_err(|e| IngestError::backup(format!("cannot serialize backup: {e}")))?;
    encoder
        .write_all(&json)
        .map_err(|e| IngestError::backup(format!("cannot write {}: {e}", path.display())))?;
    let file = encoder
        .finish()
        .map_err(|e| IngestError::backup(format!("cannot finish {}: {e}", path.display())))?;
    file.sync_all()
        .map_err(|e| IngestError::backup(format!("cannot sync {}: {e}", path.display())))?;

    info!(path = %path.display(), rates = backup.rate_count, "backup written");
    Ok(path)
}

/// Reads and verifies a backup file.
pub fn read_backup(path: &Path) -> IngestResult<BackupFile> {
    let file = File::open(path)
        .map_err(|e| IngestError::backup(format!("cannot open {}: {e}", path.display())))?;
    let mut decoder = GzDecoder::new(file);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| IngestError::backup(format!("cannot read {}: {e}", path.display())))?;
    let backup: BackupFile = serde_json::from_slice(&json)
        .map_err(|e| IngestError::backup(format!("cannot parse {}: {e}", path.display())))?;

    if backup.rate_count != backup.rates.len() {
        return Err(IngestError::CorruptBackup {
            path: path.display().to_string(),
            reason: format!(
                "rate_count says {} but {} rates are present",
                backup.rate_count,
                backup.rates.len()
            ),
        });
    }
    Ok(backup)
}
