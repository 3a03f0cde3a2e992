//! Cost derivation for one asset instance.
//!
//! Runs the asset's mapper, resolves each numeric unit against the
//! pricing snapshot, stamps the dependency path, and applies the
//! pessimistic confidence rules. Pure relative to its inputs, which is
//! what makes per-instance parallelism safe.

use rust_decimal::Decimal;

use terracast_core::envelope::EstimationMode;
use terracast_core::error::{EstimateError, EstimateResult};
use terracast_core::money::Money;
use terracast_core::usage::UsageContext;
use terracast_graph::DependencyGraph;
use terracast_mappers::{AssetView, Cloud, MapperRegistry, PriceableUnit};
use terracast_pricing::{PricingSnapshot, Rate, RateMatch};

use terracast_core::input::AttrView;

use crate::asset::AssetInstance;
use crate::context::EngineConfig;
use crate::cost::{CostUnit, Lineage, Warning};

/// Units and warnings produced for one asset.
#[derive(Debug, Clone, Default)]
pub struct DeriveOutput {
    /// Cost units, in mapper emission order.
    pub units: Vec<CostUnit>,
    /// Warnings raised while deriving.
    pub warnings: Vec<Warning>,
}

/// Maps a provider type onto the mapper catalog's cloud.
#[must_use]
fn cloud_of(provider_type: &str) -> Option<Cloud> {
    match provider_type {
        "aws" => Some(Cloud::Aws),
        "google" => Some(Cloud::Google),
        "azurerm" | "azure" => Some(Cloud::Azure),
        _ => None,
    }
}

/// Derives the cost units of one asset instance.
pub fn derive_asset(
    asset: &AssetInstance,
    graph: &DependencyGraph,
    registry: &MapperRegistry,
    snapshot: &PricingSnapshot,
    usage: &UsageContext,
    config: &EngineConfig,
    mode: EstimationMode,
    include_lineage: bool,
) -> EstimateResult<DeriveOutput> {
    let path = graph.path_from_root(&asset.definition_id);
    let mut out = DeriveOutput::default();

    let cloud = cloud_of(&asset.provider.key.provider_type);
    let entry = cloud.and_then(|c| registry.lookup(c, &asset.resource_type));

    let Some(entry) = entry else {
        // No catalog entry: strict aborts, permissive records the gap
        // and keeps the asset as a zero-cost lineage node.
        if mode.is_strict() {
            return Err(EstimateError::unsupported_resource(
                &asset.resource_type,
                &asset.address,
            ));
        }
        out.warnings.push(Warning::new(
            "unsupported_resource",
            format!("no mapper registered for {}", asset.resource_type),
            Some(asset.address.clone()),
        ));
        out.units.push(CostUnit::zero_cost(
            &asset.id,
            &asset.address,
            path,
            config.currency,
        ));
        return Ok(out);
    };

    let Some(mapper) = entry.mapper.as_ref() else {
        // Tier 3: no direct charge, lineage only.
        out.units.push(CostUnit::zero_cost(
            &asset.id,
            &asset.address,
            path,
            config.currency,
        ));
        return Ok(out);
    };

    let view = AssetView {
        address: &asset.address,
        resource_type: &asset.resource_type,
        region: &asset.provider.region,
        provider_alias: asset.provider.key.alias_or_default(),
        attributes: AttrView::new(&asset.attributes),
    };

    let vectors = mapper.build_usage(&view, usage);
    let priceable = mapper.build_cost_units(&view, &vectors);

    for unit in priceable {
        match unit {
            PriceableUnit::Numeric {
                name,
                unit,
                quantity,
                rate_key,
                confidence,
            } => {
                let plan = config.fallback_plans.get(&rate_key.service);
                let resolved = snapshot
                    .resolve(&rate_key, plan)
                    .unwrap_or_else(|e| panic!("mapper emitted an invalid rate key: {e}"));

                match resolved {
                    Some(matched) => {
                        let (monthly, formula) = amount_for(&matched, quantity);
                        let confidence =
                            confidence.combine_min(tier_confidence(&matched.rates));
                        let mut cost_unit = CostUnit::numeric(
                            &asset.id,
                            &asset.address,
                            &name,
                            path.clone(),
                            matched.resolved_key.canonical(),
                            quantity,
                            &unit,
                            monthly,
                            confidence,
                        );
                        if include_lineage {
                            cost_unit = cost_unit.with_lineage(Lineage {
                                usage_source: format!("mapper:{}", mapper.name()),
                                rate_key: matched.resolved_key.canonical(),
                                formula,
                                snapshot_hash: snapshot.content_hash().to_string(),
                            });
                        }
                        out.units.push(cost_unit);
                    }
                    None => {
                        let canonical = rate_key.canonical();
                        if mode.is_strict() {
                            return Err(EstimateError::rate_not_found(canonical));
                        }
                        out.warnings.push(Warning::new(
                            "rate_not_found",
                            format!("no rate found for {canonical}"),
                            Some(asset.address.clone()),
                        ));
                        out.units.push(CostUnit::symbolic(
                            &asset.id,
                            &asset.address,
                            &name,
                            path.clone(),
                            format!("no rate found for {canonical}"),
                            config.currency,
                        ));
                    }
                }
            }
            PriceableUnit::Symbolic { name, reason } => {
                out.units.push(CostUnit::symbolic(
                    &asset.id,
                    &asset.address,
                    &name,
                    path.clone(),
                    reason,
                    config.currency,
                ));
            }
        }
    }

    Ok(out)
}

/// Lowest source confidence across the tiers that priced a quantity.
fn tier_confidence(rates: &[Rate]) -> terracast_core::confidence::Confidence {
    terracast_core::confidence::Confidence::min_of(rates.iter().map(|r| r.source_confidence))
}

/// Monthly amount for a quantity under a (possibly tiered) match,
/// plus the formula string recorded in lineage.
fn amount_for(matched: &RateMatch, quantity: Decimal) -> (Money, String) {
    let currency = matched.rates[0].currency;
    if matched.rates.len() == 1 && matched.rates[0].tier.is_none() {
        let rate = &matched.rates[0];
        let monthly = Money::new(rate.unit_price * quantity, currency);
        let formula = format!("{}/{} x {}", rate.unit_price, rate.unit, quantity);
        return (monthly, formula);
    }

    // Tiered: each tier prices the slice of the quantity inside its
    // bounds.
    let mut total = Money::zero(currency);
    let mut parts: Vec<String> = Vec::new();
    for rate in &matched.rates {
        let (start, end) = match &rate.tier {
            Some(tier) => (tier.start, tier.end),
            None => (Decimal::ZERO, None),
        };
        let upper = end.unwrap_or(quantity).min(quantity);
        if upper <= start {
            continue;
        }
        let slice = upper - start;
        total += Money::new(rate.unit_price * slice, currency);
        parts.push(format!("{} x {}", rate.unit_price, slice));
    }
    (total, parts.join(" + "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::BTreeMap;

    use terracast_core::money::Currency;
    use terracast_graph::{DependencyNode, GraphBuilder, NodeId, NodeKind};
    use terracast_pricing::{RateKey, SnapshotBuilder, TierBounds};

    use crate::asset::InstanceKey;
    use crate::provider::{FrozenProvider, ProviderKey};

    fn graph_with(address: &str, rtype: &str) -> DependencyGraph {
        let mut builder = GraphBuilder::new();
        builder.add_node(DependencyNode::new(address, NodeKind::Resource).with_resource_type(rtype));
        builder.seal().unwrap()
    }

    fn asset(address: &str, rtype: &str, attrs: BTreeMap<String, serde_json::Value>) -> AssetInstance {
        AssetInstance::new(
            NodeId::new(address),
            rtype,
            InstanceKey::None,
            FrozenProvider {
                key: ProviderKey::new("aws", None),
                region: "us-east-1".into(),
                config: BTreeMap::new(),
            },
            attrs,
        )
    }

    fn ec2_snapshot() -> PricingSnapshot {
        let mut builder = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        builder.add_rate(
            RateKey::new("aws", "AmazonEC2", "Compute Instance", "us-east-1", "default")
                .with_attribute("instance_type", "t3.micro")
                .with_attribute("os", "linux")
                .with_attribute("tenancy", "shared"),
            Rate::new("hours", dec!(0.0104), Currency::Usd),
        );
        builder.seal()
    }

    #[test]
    fn prices_a_t3_micro_for_the_month() {
        let mut attrs = BTreeMap::new();
        attrs.insert("instance_type".to_string(), json!("t3.micro"));
        let asset = asset("aws_instance.web", "aws_instance", attrs);
        let graph = graph_with("aws_instance.web", "aws_instance");
        let registry = MapperRegistry::builtin();
        let snapshot = ec2_snapshot();

        let out = derive_asset(
            &asset,
            &graph,
            &registry,
            &snapshot,
            &UsageContext::new("default"),
            &EngineConfig::default(),
            EstimationMode::Strict,
            true,
        )
        .unwrap();

        assert_eq!(out.units.len(), 1);
        let unit = &out.units[0];
        assert_eq!(unit.monthly.amount, dec!(7.5920));
        assert!((unit.confidence.value() - 0.95).abs() < 1e-9);
        assert_eq!(unit.dependency_path.last().unwrap().as_str(), "aws_instance.web");
        assert!(unit.lineage.as_ref().unwrap().formula.contains("0.0104"));
    }

    #[test]
    fn rate_miss_is_fatal_in_strict_mode() {
        let mut attrs = BTreeMap::new();
        attrs.insert("instance_type".to_string(), json!("z99.huge"));
        let asset = asset("aws_instance.web", "aws_instance", attrs);
        let graph = graph_with("aws_instance.web", "aws_instance");

        let err = derive_asset(
            &asset,
            &graph,
            &MapperRegistry::builtin(),
            &ec2_snapshot(),
            &UsageContext::new("default"),
            &EngineConfig::default(),
            EstimationMode::Strict,
            false,
        )
        .unwrap_err();
        assert_eq!(err.code(), "rate_not_found");
    }

    #[test]
    fn rate_miss_is_symbolic_in_permissive_mode() {
        let mut attrs = BTreeMap::new();
        attrs.insert("instance_type".to_string(), json!("z99.huge"));
        let asset = asset("aws_instance.web", "aws_instance", attrs);
        let graph = graph_with("aws_instance.web", "aws_instance");

        let out = derive_asset(
            &asset,
            &graph,
            &MapperRegistry::builtin(),
            &ec2_snapshot(),
            &UsageContext::new("default"),
            &EngineConfig::default(),
            EstimationMode::Permissive,
            false,
        )
        .unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].code, "rate_not_found");
        assert!(out.units[0].symbolic);
        assert!(out.units[0].monthly.is_zero());
    }

    #[test]
    fn indirect_resource_is_zero_cost_lineage() {
        let asset = asset("aws_subnet.a", "aws_subnet", BTreeMap::new());
        let graph = graph_with("aws_subnet.a", "aws_subnet");

        let out = derive_asset(
            &asset,
            &graph,
            &MapperRegistry::builtin(),
            &ec2_snapshot(),
            &UsageContext::new("default"),
            &EngineConfig::default(),
            EstimationMode::Strict,
            false,
        )
        .unwrap();
        assert_eq!(out.units.len(), 1);
        assert!(out.units[0].monthly.is_zero());
        assert!(!out.units[0].symbolic);
    }

    #[test]
    fn unsupported_resource_warns_in_permissive_mode() {
        let asset = asset("aws_quantum.q", "aws_quantum", BTreeMap::new());
        let graph = graph_with("aws_quantum.q", "aws_quantum");

        let out = derive_asset(
            &asset,
            &graph,
            &MapperRegistry::builtin(),
            &ec2_snapshot(),
            &UsageContext::new("default"),
            &EngineConfig::default(),
            EstimationMode::Permissive,
            false,
        )
        .unwrap();
        assert_eq!(out.warnings[0].code, "unsupported_resource");

        let err = derive_asset(
            &asset,
            &graph,
            &MapperRegistry::builtin(),
            &ec2_snapshot(),
            &UsageContext::new("default"),
            &EngineConfig::default(),
            EstimationMode::Strict,
            false,
        )
        .unwrap_err();
        assert_eq!(err.code(), "unsupported_resource");
    }

    #[test]
    fn tiered_rates_split_the_quantity() {
        let key = RateKey::new("aws", "AmazonS3", "Storage", "us-east-1", "default")
            .with_attribute("storage_class", "standard");
        let mut builder = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        builder.add_rate(
            key.clone(),
            Rate::new("gb_month", dec!(0.023), Currency::Usd)
                .with_tier(TierBounds::new(dec!(0), Some(dec!(100)))),
        );
        builder.add_rate(
            key.clone(),
            Rate::new("gb_month", dec!(0.022), Currency::Usd)
                .with_tier(TierBounds::new(dec!(100), None)),
        );
        let snapshot = builder.seal();

        let matched = snapshot.resolve(&key, None).unwrap().unwrap();
        let (monthly, _) = amount_for(&matched, dec!(150));
        // 100 x 0.023 + 50 x 0.022
        assert_eq!(monthly.amount, dec!(3.40));
    }
}
