//! Governance validation of normalized catalogs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::normalize::NormalizedRate;

/// Per-service contract: how many rates a healthy ingestion yields and
/// which dimensions every rate must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContract {
    /// Service the contract governs.
    pub service: String,
    /// Minimum acceptable rate count.
    pub min_rates: usize,
    /// Attribute names that must appear somewhere in the service's
    /// rates.
    pub required_dimensions: Vec<String>,
}

impl ServiceContract {
    /// Creates a contract.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        min_rates: usize,
        required_dimensions: &[&str],
    ) -> Self {
        Self {
            service: service.into(),
            min_rates,
            required_dimensions: required_dimensions
                .iter()
                .map(|d| (*d).to_string())
                .collect(),
        }
    }

    /// The default AWS contracts.
    #[must_use]
    pub fn aws_defaults() -> Vec<ServiceContract> {
        vec![
            Self::new("AmazonEC2", 100, &["instance_type", "os", "tenancy"]),
            Self::new("AmazonRDS", 50, &["instance_class"]),
            Self::new("AmazonS3", 10, &["storage_class"]),
        ]
    }
}

/// Validates staged rates against contracts and an optional coverage
/// floor relative to a baseline rate count.
pub fn validate(
    rates_by_service: &BTreeMap<String, Vec<NormalizedRate>>,
    contracts: &[ServiceContract],
    baseline: Option<(usize, f64)>,
) -> IngestResult<()> {
    for contract in contracts {
        let Some(rates) = rates_by_service.get(&contract.service) else {
            return Err(IngestError::validation(format!(
                "service {} is missing from the catalog",
                contract.service
            )));
        };
        if rates.len() < contract.min_rates {
            return Err(IngestError::validation(format!(
                "service {} yielded {} rates, contract requires at least {}",
                contract.service,
                rates.len(),
                contract.min_rates
            )));
        }
        for dimension in &contract.required_dimensions {
            let present = rates
                .iter()
                .any(|rate| rate.key.attributes.contains_key(dimension));
            if !present {
                return Err(IngestError::validation(format!(
                    "service {} has no rate carrying dimension {dimension}",
                    contract.service
                )));
            }
        }
    }

    if let Some((baseline_count, min_coverage)) = baseline {
        let total: usize = rates_by_service.values().map(Vec::len).sum();
        let coverage = if baseline_count == 0 {
            1.0
        } else {
            total as f64 / baseline_count as f64
        };
        if coverage < min_coverage {
            return Err(IngestError::validation(format!(
                "coverage {coverage:.2} below required {min_coverage:.2} \
                 ({total} rates vs baseline {baseline_count})"
            )));
        }
    }

    debug!(
        services = rates_by_service.len(),
        contracts = contracts.len(),
        "catalog validated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use terracast_core::money::Currency;
    use terracast_pricing::{Rate, RateKey};

    fn rates(service: &str, count: usize, dimension: &str) -> Vec<NormalizedRate> {
        (0..count)
            .map(|i| NormalizedRate {
                key: RateKey::new("aws", service, "f", "us-east-1", "default")
                    .with_attribute(dimension, format!("v{i}")),
                rate: Rate::new("hours", dec!(1), Currency::Usd),
            })
            .collect()
    }

    #[test]
    fn contract_violations_abort() {
        let mut by_service = BTreeMap::new();
        by_service.insert("AmazonEC2".to_string(), rates("AmazonEC2", 3, "instance_type"));

        let contracts = vec![ServiceContract::new("AmazonEC2", 5, &["instance_type"])];
        let err = validate(&by_service, &contracts, None).unwrap_err();
        assert!(err.to_string().contains("at least 5"));

        let contracts = vec![ServiceContract::new("AmazonEC2", 2, &["tenancy"])];
        let err = validate(&by_service, &contracts, None).unwrap_err();
        assert!(err.to_string().contains("tenancy"));

        let contracts = vec![ServiceContract::new("AmazonEC2", 2, &["instance_type"])];
        assert!(validate(&by_service, &contracts, None).is_ok());
    }

    #[test]
    fn coverage_floor_is_enforced() {
        let mut by_service = BTreeMap::new();
        by_service.insert("AmazonEC2".to_string(), rates("AmazonEC2", 50, "instance_type"));

        assert!(validate(&by_service, &[], Some((100, 0.4))).is_ok());
        let err = validate(&by_service, &[], Some((100, 0.9))).unwrap_err();
        assert!(matches!(err, IngestError::Validation { .. }));
    }
}
