//! Rate keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The tuple by which one line item is looked up in a pricing catalog.
///
/// Two keys are equal iff every field is equal. The attribute map is a
/// `BTreeMap` so the canonical string form is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RateKey {
    /// Cloud provider, e.g. `aws`.
    pub provider: String,
    /// Service, e.g. `AmazonEC2`.
    pub service: String,
    /// Product family, e.g. `Compute Instance`.
    pub product_family: String,
    /// Region, e.g. `us-east-1`.
    pub region: String,
    /// Provider alias; mandatory for every lookup.
    pub provider_alias: String,
    /// Canonical attribute map, e.g. `instance_type=t3.micro`.
    pub attributes: BTreeMap<String, String>,
}

impl RateKey {
    /// Creates a key with no attributes.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        service: impl Into<String>,
        product_family: impl Into<String>,
        region: impl Into<String>,
        provider_alias: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            service: service.into(),
            product_family: product_family.into(),
            region: region.into(),
            provider_alias: provider_alias.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns a copy without the named attributes.
    #[must_use]
    pub fn without_attributes(&self, names: &[&str]) -> Self {
        let mut copy = self.clone();
        for name in names {
            copy.attributes.remove(*name);
        }
        copy
    }

    /// Canonical string form, used as the storage key and in content
    /// hashes. Attribute order is the map's sorted order.
    #[must_use]
    pub fn canonical(&self) -> String {
        let attrs: Vec<String> = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!(
            "{}:{}:{}:{}:{}{{{}}}",
            self.provider,
            self.service,
            self.product_family,
            self.region,
            self.provider_alias,
            attrs.join(",")
        )
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
