//! Catalog normalization.
//!
//! Providers publish attribute keys, units, and prices in their own
//! dialects. Normalization rewrites them into the canonical vocabulary
//! rate keys use: a fixed key-mapping table per provider, a unit
//! table, lowercased values, and prices parsed into decimals.
//! Unparsable entries are skipped and counted, never guessed at.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tracing::trace;

use terracast_core::confidence::Confidence;
use terracast_core::money::Currency;
use terracast_pricing::{Rate, RateKey};

use crate::fetch::RawCatalogEntry;

/// Confidence assigned to rates from a provider's published catalog.
const CATALOG_CONFIDENCE: f64 = 0.98;

/// A normalized rate ready for staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRate {
    /// The canonical rate key.
    pub key: RateKey,
    /// The rate.
    pub rate: Rate,
}

/// Canonical attribute names for AWS catalog keys.
fn aws_attribute_map() -> &'static [(&'static str, &'static str)] {
    &[
        ("instanceType", "instance_type"),
        ("instanceClass", "instance_class"),
        ("operatingSystem", "os"),
        ("tenancy", "tenancy"),
        ("volumeApiName", "volume_api_name"),
        ("volumeType", "volume_type"),
        ("storageClass", "storage_class"),
        ("deploymentOption", "deployment_option"),
        ("databaseEngine", "database_engine"),
        ("usagetype", "usagetype"),
        ("group", "group"),
    ]
}

/// Canonical unit names.
fn unit_map() -> &'static [(&'static str, &'static str)] {
    &[
        ("Hrs", "hours"),
        ("Hours", "hours"),
        ("GB-Mo", "gb_month"),
        ("GB-month", "gb_month"),
        ("GB-Month", "gb_month"),
        ("IOPS-Mo", "iops_month"),
        ("Requests", "requests"),
        ("Lambda-GB-Second", "gb_seconds"),
        ("GB-Second", "gb_seconds"),
        ("GB", "gb"),
    ]
}

/// Canonicalizes one attribute key for a provider.
#[must_use]
fn canonical_attribute(provider: &str, key: &str) -> String {
    if provider == "aws" {
        for (from, to) in aws_attribute_map() {
            if *from == key {
                return (*to).to_string();
            }
        }
    }
    key.to_ascii_lowercase()
}

/// Canonicalizes a unit string.
#[must_use]
pub fn canonical_unit(unit: &str) -> String {
    for (from, to) in unit_map() {
        if *from == unit {
            return (*to).to_string();
        }
    }
    unit.to_ascii_lowercase()
}

/// Normalizes one raw entry into a rate, or `None` when the entry
/// cannot be parsed (bad price, unknown currency).
#[must_use]
pub fn normalize_entry(
    provider: &str,
    region: &str,
    alias: &str,
    entry: &RawCatalogEntry,
) -> Option<NormalizedRate> {
    let price: Decimal = match entry.price.trim().parse() {
        Ok(price) => price,
        Err(_) => {
            trace!(price = %entry.price, "skipping unparsable price");
            return None;
        }
    };
    let currency = match entry.currency.to_ascii_uppercase().as_str() {
        "USD" => Currency::Usd,
        "EUR" => Currency::Eur,
        "GBP" => Currency::Gbp,
        _ => {
            trace!(currency = %entry.currency, "skipping unknown currency");
            return None;
        }
    };

    let mut attributes = BTreeMap::new();
    for (key, value) in &entry.attributes {
        attributes.insert(
            canonical_attribute(provider, key),
            value.to_ascii_lowercase(),
        );
    }

    let mut key = RateKey::new(
        provider,
        &entry.service,
        &entry.product_family,
        region,
        alias,
    );
    key.attributes = attributes;

    let rate = Rate::new(canonical_unit(&entry.unit), price, currency)
        .with_source_confidence(Confidence::new(CATALOG_CONFIDENCE));

    Some(NormalizedRate { key, rate })
}

/// Normalizes one service's entries; returns the rates and how many
/// entries were skipped.
#[must_use]
pub fn normalize_service(
    provider: &str,
    region: &str,
    alias: &str,
    entries: &[RawCatalogEntry],
) -> (Vec<NormalizedRate>, usize) {
    let mut rates = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        match normalize_entry(provider, region, alias, entry) {
            Some(rate) => rates.push(rate),
            None => skipped += 1,
        }
    }
    (rates, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry() -> RawCatalogEntry {
        let mut attributes = BTreeMap::new();
        attributes.insert("instanceType".to_string(), "t3.micro".to_string());
        attributes.insert("operatingSystem".to_string(), "Linux".to_string());
        attributes.insert("tenancy".to_string(), "Shared".to_string());
        RawCatalogEntry {
            service: "AmazonEC2".into(),
            product_family: "Compute Instance".into(),
            attributes,
            price: "0.0104000000".into(),
            unit: "Hrs".into(),
            currency: "USD".into(),
        }
    }

    #[test]
    fn canonicalizes_keys_units_and_values() {
        let rate = normalize_entry("aws", "us-east-1", "default", &entry()).unwrap();
        assert_eq!(
            rate.key.attributes.get("instance_type").unwrap(),
            "t3.micro"
        );
        assert_eq!(rate.key.attributes.get("os").unwrap(), "linux");
        assert_eq!(rate.key.attributes.get("tenancy").unwrap(), "shared");
        assert_eq!(rate.rate.unit, "hours");
        assert_eq!(rate.rate.unit_price, dec!(0.0104));
    }

    #[test]
    fn unparsable_price_is_skipped_not_zeroed() {
        let mut bad = entry();
        bad.price = "N/A".into();
        let (rates, skipped) = normalize_service("aws", "us-east-1", "default", &[entry(), bad]);
        assert_eq!(rates.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn unit_table_covers_storage_units() {
        assert_eq!(canonical_unit("GB-Mo"), "gb_month");
        assert_eq!(canonical_unit("Quantum-Units"), "quantum-units");
    }
}
