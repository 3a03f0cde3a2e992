//! Catalog fetching.
//!
//! [`CatalogSource`] is the network seam: implementations wrap a
//! provider's bulk pricing API. The lifecycle fetches the *complete*
//! catalog for a region; fetching is never filtered by which mappers
//! currently exist, so a mapper added next month prices against
//! snapshots ingested today.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{IngestError, IngestResult};

/// Maximum parallel service fetches.
pub const MAX_PARALLEL_FETCHES: usize = 4;

/// One raw catalog line item, as the provider published it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCatalogEntry {
    /// Service, e.g. `AmazonEC2`.
    pub service: String,
    /// Product family, e.g. `Compute Instance`.
    pub product_family: String,
    /// Raw attribute map (`instanceType` → `t3.micro`).
    pub attributes: BTreeMap<String, String>,
    /// Raw price string, e.g. `0.0104000000`.
    pub price: String,
    /// Raw unit string, e.g. `Hrs`.
    pub unit: String,
    /// Currency code, e.g. `USD`.
    pub currency: String,
}

/// A provider's bulk pricing catalog.
pub trait CatalogSource: Send + Sync {
    /// The services this source publishes for the region.
    fn services(&self) -> Vec<String>;

    /// Fetches every product of one service. May block on the network.
    fn fetch_service(&self, service: &str) -> IngestResult<Vec<RawCatalogEntry>>;
}

/// Fetches all services with at most `parallel` workers, returning
/// entries grouped by service in sorted order.
pub fn fetch_all(
    source: &dyn CatalogSource,
    services: &[String],
    parallel: usize,
) -> IngestResult<BTreeMap<String, Vec<RawCatalogEntry>>> {
    let workers = parallel.clamp(1, MAX_PARALLEL_FETCHES);
    let queue: Mutex<Vec<String>> = Mutex::new(services.iter().rev().cloned().collect());
    let results: Mutex<BTreeMap<String, Vec<RawCatalogEntry>>> = Mutex::new(BTreeMap::new());
    let failure: Mutex<Option<IngestError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if failure.lock().is_some() {
                    return;
                }
                let Some(service) = queue.lock().pop() else {
                    return;
                };
                match source.fetch_service(&service) {
                    Ok(entries) => {
                        debug!(service = %service, entries = entries.len(), "service fetched");
                        results.lock().insert(service, entries);
                    }
                    Err(error) => {
                        *failure.lock() = Some(error);
                        return;
                    }
                }
            });
        }
    });

    if let Some(error) = failure.into_inner() {
        return Err(error);
    }
    Ok(results.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource;

    impl CatalogSource for StaticSource {
        fn services(&self) -> Vec<String> {
            vec!["AmazonEC2".into(), "AmazonRDS".into(), "AmazonS3".into()]
        }

        fn fetch_service(&self, service: &str) -> IngestResult<Vec<RawCatalogEntry>> {
            if service == "AmazonRDS" {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            Ok(vec![RawCatalogEntry {
                service: service.to_string(),
                product_family: "x".into(),
                attributes: BTreeMap::new(),
                price: "1".into(),
                unit: "Hrs".into(),
                currency: "USD".into(),
            }])
        }
    }

    #[test]
    fn fetches_every_service_regardless_of_width() {
        let source = StaticSource;
        let services = source.services();
        for parallel in [1, 2, 4, 9] {
            let fetched = fetch_all(&source, &services, parallel).unwrap();
            assert_eq!(fetched.len(), 3);
            assert!(fetched.contains_key("AmazonRDS"));
        }
    }

    struct FailingSource;

    impl CatalogSource for FailingSource {
        fn services(&self) -> Vec<String> {
            vec!["AmazonEC2".into()]
        }

        fn fetch_service(&self, service: &str) -> IngestResult<Vec<RawCatalogEntry>> {
            Err(IngestError::network(service, "connection reset"))
        }
    }

    #[test]
    fn fetch_failure_propagates() {
        let source = FailingSource;
        let err = fetch_all(&source, &source.services(), 2).unwrap_err();
        assert!(matches!(err, IngestError::Network { .. }));
    }
}
