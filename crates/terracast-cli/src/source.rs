//! File-backed catalog source.
//!
//! Operators download a provider's bulk offer file once and point the
//! CLI at it; live API fetchers plug in at deployment through the same
//! `CatalogSource` trait.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use terracast_ingest::{CatalogSource, IngestError, IngestResult, RawCatalogEntry};

/// The bulk catalog file: entries grouped by region, then service.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    /// Raw entries per region.
    pub regions: BTreeMap<String, Vec<RawCatalogEntry>>,
}

impl CatalogFile {
    /// Loads and parses the file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read(path)
            .with_context(|| format!("cannot read catalog file {}", path.display()))?;
        serde_json::from_slice(&json)
            .with_context(|| format!("cannot parse catalog file {}", path.display()))
    }

    /// Regions present in the file, sorted.
    pub fn region_names(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    /// A catalog source scoped to one region.
    pub fn source_for(&self, region: &str) -> Option<FileCatalogSource> {
        self.regions.get(region).map(|entries| {
            let mut by_service: BTreeMap<String, Vec<RawCatalogEntry>> = BTreeMap::new();
            for entry in entries {
                by_service
                    .entry(entry.service.clone())
                    .or_default()
                    .push(entry.clone());
            }
            FileCatalogSource { by_service }
        })
    }
}

/// [`CatalogSource`] over one region of a loaded catalog file.
pub struct FileCatalogSource {
    by_service: BTreeMap<String, Vec<RawCatalogEntry>>,
}

impl CatalogSource for FileCatalogSource {
    fn services(&self) -> Vec<String> {
        self.by_service.keys().cloned().collect()
    }

    fn fetch_service(&self, service: &str) -> IngestResult<Vec<RawCatalogEntry>> {
        self.by_service
            .get(service)
            .cloned()
            .ok_or_else(|| IngestError::network(service, "service not present in catalog file"))
    }
}
