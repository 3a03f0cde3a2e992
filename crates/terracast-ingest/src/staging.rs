//! Staging strategies.
//!
//! The lifecycle hands each service's normalized rates to a
//! [`Staging`] implementation and later collects the full set to build
//! the snapshot. [`MemoryStaging`] keeps everything in a map.
//! [`StreamingStaging`] spills each service to a gzipped JSON-lines
//! temp file and maintains a checkpoint so an interrupted run resumes
//! without re-fetching completed services; on a successful commit the
//! checkpoint and temp files are deleted.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::normalize::NormalizedRate;

/// File name of the resume checkpoint inside a staging directory.
const CHECKPOINT_FILE: &str = "ingest-checkpoint.json";

/// Where one service's rates go during the staging phase.
pub trait Staging {
    /// Stages one service's rates. Called once per service.
    fn stage(&mut self, service: &str, rates: Vec<NormalizedRate>) -> IngestResult<()>;

    /// Services already staged (non-empty only after a resume).
    fn completed_services(&self) -> BTreeSet<String>;

    /// Collects every staged rate, grouped by service.
    fn collect(&self) -> IngestResult<BTreeMap<String, Vec<NormalizedRate>>>;

    /// Removes staging artifacts after a successful commit.
    fn cleanup(&mut self) -> IngestResult<()>;
}

// =============================================================================
// MEMORY STAGING
// =============================================================================

/// The in-memory strategy.
#[derive(Debug, Default)]
pub struct MemoryStaging {
    rates: BTreeMap<String, Vec<NormalizedRate>>,
}

impl MemoryStaging {
    /// Creates an empty staging area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Staging for MemoryStaging {
    fn stage(&mut self, service: &str, rates: Vec<NormalizedRate>) -> IngestResult<()> {
        self.rates.insert(service.to_string(), rates);
        Ok(())
    }

    fn completed_services(&self) -> BTreeSet<String> {
        self.rates.keys().cloned().collect()
    }

    fn collect(&self) -> IngestResult<BTreeMap<String, Vec<NormalizedRate>>> {
        Ok(self.rates.clone())
    }

    fn cleanup(&mut self) -> IngestResult<()> {
        self.rates.clear();
        Ok(())
    }
}

// =============================================================================
// STREAMING STAGING
// =============================================================================

/// Resume state written after every staged service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Checkpoint {
    completed_services: Vec<String>,
    temp_paths: BTreeMap<String, PathBuf>,
}

/// The low-memory strategy: gzipped JSON-lines per service plus a
/// checkpoint file.
#[derive(Debug)]
pub struct StreamingStaging {
    dir: PathBuf,
    checkpoint: Checkpoint,
}

impl StreamingStaging {
    /// Opens a staging directory, resuming from its checkpoint when
    /// one exists.
    pub fn open(dir: &Path) -> IngestResult<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| IngestError::staging(format!("cannot create {}: {e}", dir.display())))?;
        let checkpoint_path = dir.join(CHECKPOINT_FILE);
        let checkpoint = if checkpoint_path.exists() {
            let json = std::fs::read(&checkpoint_path)
                .map_err(|e| IngestError::staging(format!("cannot read checkpoint: {e}")))?;
            let checkpoint: Checkpoint = serde_json::from_slice(&json)
                .map_err(|e| IngestError::staging(format!("cannot parse checkpoint: {e}")))?;
            debug!(
                completed = checkpoint.completed_services.len(),
                "resuming from checkpoint"
            );
            checkpoint
        } else {
            Checkpoint::default()
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            checkpoint,
        })
    }

    fn write_checkpoint(&self) -> IngestResult<()> {
        let json = serde_json::to_vec_pretty(&self.checkpoint)
            .map_err(|e| IngestError::staging(format!("cannot serialize checkpoint: {e}")))?;
        std::fs::write(self.dir.join(CHECKPOINT_FILE), json)
            .map_err(|e| IngestError::staging(format!("cannot write checkpoint: {e}")))
    }

    fn temp_path(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{service}.jsonl.gz"))
    }
}

impl Staging for StreamingStaging {
    fn stage(&mut self, service: &str, rates: Vec<NormalizedRate>) -> IngestResult<()> {
        let path = self.temp_path(service);
        let file = File::create(&path)
            .map_err(|e| IngestError::staging(format!("cannot create {}: {e}", path.display())))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        for rate in &rates {
            let line = serde_json::to_string(rate)
                .map_err(|e| IngestError::staging(format!("cannot serialize rate: {e}")))?;
            writeln!(encoder, "{line}")
                .map_err(|e| IngestError::staging(format!("cannot write temp file: {e}")))?;
        }
        encoder
            .finish()
            .map_err(|e| IngestError::staging(format!("cannot finish temp file: {e}")))?;

        self.checkpoint
            .temp_paths
            .insert(service.to_string(), path);
        if !self
            .checkpoint
            .completed_services
            .iter()
            .any(|s| s == service)
        {
            self.checkpoint.completed_services.push(service.to_string());
        }
        self.write_checkpoint()
    }

    fn completed_services(&self) -> BTreeSet<String> {
        self.checkpoint
            .completed_services
            .iter()
            .cloned()
            .collect()
    }

    fn collect(&self) -> IngestResult<BTreeMap<String, Vec<NormalizedRate>>> {
        let mut all = BTreeMap::new();
        for (service, path) in &self.checkpoint.temp_paths {
            let file = File::open(path).map_err(|e| {
                IngestError::staging(format!("cannot open {}: {e}", path.display()))
            })?;
            let reader = BufReader::new(GzDecoder::new(file));
            let mut rates = Vec::new();
            for line in reader.lines() {
                let line = line
                    .map_err(|e| IngestError::staging(format!("cannot read temp file: {e}")))?;
                if line.trim().is_empty() {
                    continue;
                }
                let rate: NormalizedRate = serde_json::from_str(&line)
                    .map_err(|e| IngestError::staging(format!("cannot parse staged rate: {e}")))?;
                rates.push(rate);
            }
            all.insert(service.clone(), rates);
        }
        Ok(all)
    }

    fn cleanup(&mut self) -> IngestResult<()> {
        for path in self.checkpoint.temp_paths.values() {
            let _ = std::fs::remove_file(path);
        }
        let _ = std::fs::remove_file(self.dir.join(CHECKPOINT_FILE));
        self.checkpoint = Checkpoint::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use terracast_core::money::Currency;
    use terracast_pricing::{Rate, RateKey};

    fn rate(instance_type: &str) -> NormalizedRate {
        NormalizedRate {
            key: RateKey::new("aws", "AmazonEC2", "Compute Instance", "us-east-1", "default")
                .with_attribute("instance_type", instance_type),
            rate: Rate::new("hours", dec!(0.0104), Currency::Usd),
        }
    }

    #[test]
    fn streaming_roundtrips_rates() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StreamingStaging::open(dir.path()).unwrap();
        staging
            .stage("AmazonEC2", vec![rate("t3.micro"), rate("t3.small")])
            .unwrap();

        let collected = staging.collect().unwrap();
        assert_eq!(collected["AmazonEC2"].len(), 2);
        assert_eq!(collected["AmazonEC2"][0], rate("t3.micro"));
    }

    #[test]
    fn checkpoint_survives_reopen_and_cleanup_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut staging = StreamingStaging::open(dir.path()).unwrap();
            staging.stage("AmazonEC2", vec![rate("t3.micro")]).unwrap();
        }

        // A new process resumes and skips the completed service.
        let mut resumed = StreamingStaging::open(dir.path()).unwrap();
        assert!(resumed.completed_services().contains("AmazonEC2"));
        assert_eq!(resumed.collect().unwrap()["AmazonEC2"].len(), 1);

        resumed.cleanup().unwrap();
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
        assert!(StreamingStaging::open(dir.path())
            .unwrap()
            .completed_services()
            .is_empty());
    }

    #[test]
    fn memory_staging_collects_by_service() {
        let mut staging = MemoryStaging::new();
        staging.stage("AmazonEC2", vec![rate("t3.micro")]).unwrap();
        staging.stage("AmazonS3", Vec::new()).unwrap();
        let collected = staging.collect().unwrap();
        assert_eq!(collected.len(), 2);
        staging.cleanup().unwrap();
        assert!(staging.collect().unwrap().is_empty());
    }
}
