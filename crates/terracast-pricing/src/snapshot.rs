//! Immutable, content-hashed pricing snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use terracast_core::hashing::sha256_hex;

use crate::error::{PricingError, PricingResult};
use crate::fallback::FallbackPlan;
use crate::rate::Rate;
use crate::rate_key::RateKey;

// =============================================================================
// SNAPSHOT METADATA
// =============================================================================

/// Identity and provenance of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Snapshot id; never part of the content hash.
    pub id: Uuid,
    /// Cloud provider.
    pub provider: String,
    /// Region this snapshot covers.
    pub region: String,
    /// Provider alias this snapshot covers.
    pub alias: String,
    /// Hex SHA-256 over the sorted rate lines.
    pub content_hash: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Identifier of the catalog source.
    pub source: String,
    /// Whether the snapshot is active for estimation.
    pub active: bool,
}

// =============================================================================
// PRICING SNAPSHOT
// =============================================================================

/// A match produced by rate resolution: the rate plus the key that
/// actually matched (which differs from the query under fallback).
#[derive(Debug, Clone, PartialEq)]
pub struct RateMatch {
    /// The key that matched.
    pub resolved_key: RateKey,
    /// Matching rates; more than one entry only for tiered pricing,
    /// sorted by tier start.
    pub rates: Vec<Rate>,
}

/// An immutable set of rates for one (provider, region, alias).
///
/// Only [`SnapshotBuilder::seal`] constructs one; there is no mutable
/// access afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    meta: SnapshotMeta,
    /// Rates keyed by the canonical rate-key string.
    rates: BTreeMap<String, Vec<Rate>>,
    /// Parsed keys, for entry iteration at commit time.
    keys: BTreeMap<String, RateKey>,
}

impl PricingSnapshot {
    /// Snapshot identity and provenance.
    #[must_use]
    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }

    /// Hex SHA-256 over the sorted rate lines.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.meta.content_hash
    }

    /// Returns the snapshot with the active flag set. Activation is a
    /// lifecycle transition, not a rate mutation.
    #[must_use]
    pub fn activated(mut self) -> Self {
        self.meta.active = true;
        self
    }

    /// Returns the snapshot with the active flag cleared. Rates are
    /// untouched; deactivation never deletes.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.meta.active = false;
        self
    }

    /// Number of distinct rate keys.
    #[must_use]
    pub fn rate_key_count(&self) -> usize {
        self.rates.len()
    }

    /// Total number of rates (tiers counted individually).
    #[must_use]
    pub fn rate_count(&self) -> usize {
        self.rates.values().map(Vec::len).sum()
    }

    /// Iterates `(canonical key, rates)` in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Rate>)> {
        self.rates.iter()
    }

    /// Iterates `(parsed key, rates)` in sorted canonical order. The
    /// commit phase of ingestion upserts from this.
    pub fn entries(&self) -> impl Iterator<Item = (&RateKey, &Vec<Rate>)> {
        self.keys.iter().filter_map(|(canonical, key)| {
            self.rates.get(canonical).map(|rates| (key, rates))
        })
    }

    /// Resolves a rate key: exact match, then the fallback plan's
    /// candidates in order. A key without an alias is rejected; this
    /// is what keeps multi-account estimation honest.
    pub fn resolve(
        &self,
        key: &RateKey,
        fallback: Option<&FallbackPlan>,
    ) -> PricingResult<Option<RateMatch>> {
        if key.provider_alias.trim().is_empty() {
            return Err(PricingError::missing_alias(key.canonical()));
        }

        let candidates = match fallback {
            Some(plan) => plan.candidates(key),
            None => vec![key.clone()],
        };

        for candidate in candidates {
            if let Some(rates) = self.rates.get(&candidate.canonical()) {
                return Ok(Some(RateMatch {
                    resolved_key: candidate,
                    rates: rates.clone(),
                }));
            }
        }
        Ok(None)
    }
}

// =============================================================================
// SNAPSHOT BUILDER
// =============================================================================

/// Accumulates rates, then seals them into a [`PricingSnapshot`].
#[derive(Debug)]
pub struct SnapshotBuilder {
    provider: String,
    region: String,
    alias: String,
    source: String,
    published_at: DateTime<Utc>,
    rates: BTreeMap<String, Vec<Rate>>,
    keys: BTreeMap<String, RateKey>,
}

impl SnapshotBuilder {
    /// Creates a builder for one (provider, region, alias).
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        region: impl Into<String>,
        alias: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            region: region.into(),
            alias: alias.into(),
            source: source.into(),
            published_at: Utc::now(),
            rates: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }

    /// Overrides the publication time (ingestion passes the fetch
    /// time; tests pin a constant).
    #[must_use]
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Adds a rate. Multiple rates under one key must be tiered.
    pub fn add_rate(&mut self, key: RateKey, rate: Rate) {
        let canonical = key.canonical();
        self.keys.insert(canonical.clone(), key);
        let entry = self.rates.entry(canonical).or_default();
        entry.push(rate);
        entry.sort_by(|a, b| {
            let a_start = a.tier.as_ref().map(|t| t.start);
            let b_start = b.tier.as_ref().map(|t| t.start);
            a_start.cmp(&b_start)
        });
    }

    /// Number of rates added so far.
    #[must_use]
    pub fn rate_count(&self) -> usize {
        self.rates.values().map(Vec::len).sum()
    }

    /// Computes the content hash the seal would produce.
    ///
    /// The hash covers sorted `canonical-key=price` lines only, so it
    /// is stable across publication times and snapshot ids.
    #[must_use]
    pub fn content_hash(&self) -> String {
        content_hash(&self.rates)
    }

    /// Seals into an immutable snapshot.
    #[must_use]
    pub fn seal(self) -> PricingSnapshot {
        let content_hash = content_hash(&self.rates);
        debug!(
            provider = %self.provider,
            region = %self.region,
            alias = %self.alias,
            rate_keys = self.rates.len(),
            content_hash = %content_hash,
            "pricing snapshot sealed"
        );
        PricingSnapshot {
            meta: SnapshotMeta {
                id: Uuid::new_v4(),
                provider: self.provider,
                region: self.region,
                alias: self.alias,
                content_hash,
                published_at: self.published_at,
                source: self.source,
                active: false,
            },
            rates: self.rates,
            keys: self.keys,
        }
    }
}

/// SHA-256 over sorted `key=price[,price...]` lines.
fn content_hash(rates: &BTreeMap<String, Vec<Rate>>) -> String {
    let mut lines = String::new();
    for (key, tiers) in rates {
        let prices: Vec<String> = tiers.iter().map(|r| r.unit_price.to_string()).collect();
        lines.push_str(key);
        lines.push('=');
        lines.push_str(&prices.join(","));
        lines.push('\n');
    }
    sha256_hex(lines.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use terracast_core::money::Currency;

    fn ec2_key(instance_type: &str) -> RateKey {
        RateKey::new("aws", "AmazonEC2", "Compute Instance", "us-east-1", "default")
            .with_attribute("instance_type", instance_type)
            .with_attribute("os", "linux")
            .with_attribute("tenancy", "shared")
    }

    fn snapshot() -> PricingSnapshot {
        let mut builder = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        builder.add_rate(
            ec2_key("t3.micro"),
            Rate::new("hours", dec!(0.0104), Currency::Usd),
        );
        builder.seal()
    }

    #[test]
    fn exact_resolution() {
        let snap = snapshot();
        let hit = snap.resolve(&ec2_key("t3.micro"), None).unwrap().unwrap();
        assert_eq!(hit.rates[0].unit_price, dec!(0.0104));
        assert!(snap.resolve(&ec2_key("z99.huge"), None).unwrap().is_none());
    }

    #[test]
    fn fallback_resolution_drops_in_order() {
        let snap = snapshot();
        // Query carries an extra attribute the snapshot never saw.
        let query = ec2_key("t3.micro").with_attribute("capacity_status", "used");
        assert!(snap.resolve(&query, None).unwrap().is_none());

        let plan = FallbackPlan::new(["capacity_status"]).unwrap();
        let hit = snap.resolve(&query, Some(&plan)).unwrap().unwrap();
        assert!(!hit.resolved_key.attributes.contains_key("capacity_status"));
    }

    #[test]
    fn aliasless_lookup_is_rejected() {
        let snap = snapshot();
        let mut key = ec2_key("t3.micro");
        key.provider_alias = String::new();
        let err = snap.resolve(&key, None).unwrap_err();
        assert!(matches!(err, PricingError::MissingAlias { .. }));
    }

    #[test]
    fn content_hash_ignores_publication_time() {
        let mut a = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        let mut b = SnapshotBuilder::new("aws", "us-east-1", "default", "test")
            .with_published_at(Utc::now() + chrono::Duration::days(1));
        for builder in [&mut a, &mut b] {
            builder.add_rate(
                ec2_key("t3.micro"),
                Rate::new("hours", dec!(0.0104), Currency::Usd),
            );
        }
        assert_eq!(a.seal().content_hash(), b.seal().content_hash());
    }

    #[test]
    fn content_hash_tracks_prices() {
        let mut a = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        a.add_rate(
            ec2_key("t3.micro"),
            Rate::new("hours", dec!(0.0104), Currency::Usd),
        );
        let mut b = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        b.add_rate(
            ec2_key("t3.micro"),
            Rate::new("hours", dec!(0.0110), Currency::Usd),
        );
        assert_ne!(a.seal().content_hash(), b.seal().content_hash());
    }

    #[test]
    fn tiers_sort_by_start() {
        let key = RateKey::new("aws", "AmazonS3", "Storage", "us-east-1", "default")
            .with_attribute("storage_class", "standard");
        let mut builder = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        builder.add_rate(
            key.clone(),
            Rate::new("gb_month", dec!(0.022), Currency::Usd)
                .with_tier(crate::rate::TierBounds::new(dec!(51200), None)),
        );
        builder.add_rate(
            key.clone(),
            Rate::new("gb_month", dec!(0.023), Currency::Usd)
                .with_tier(crate::rate::TierBounds::new(dec!(0), Some(dec!(51200)))),
        );
        let snap = builder.seal();
        let hit = snap.resolve(&key, None).unwrap().unwrap();
        assert_eq!(hit.rates[0].unit_price, dec!(0.023));
    }
}
