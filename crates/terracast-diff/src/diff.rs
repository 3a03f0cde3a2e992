//! The diff computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use terracast_core::confidence::Confidence;
use terracast_core::money::Currency;
use terracast_engine::cost::CostUnit;
use terracast_engine::result::EstimationResult;

/// Default relative tolerance below which a cost move is noise: 0.1%.
const DEFAULT_TOLERANCE: &str = "0.001";

// =============================================================================
// CONFIG
// =============================================================================

/// Diff tuning.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Relative tolerance for the changed/unchanged split.
    pub tolerance: Decimal,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE.parse().expect("tolerance literal parses"),
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// How an upstream asset relates to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// The upstream asset is new in head.
    Added,
    /// The upstream asset exists only in base.
    Removed,
    /// The upstream asset itself changed.
    Changed,
}

/// One link of a causal chain: an upstream asset that changed along
/// the dependency path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalLink {
    /// Address of the upstream asset.
    pub address: String,
    /// Its partition in this diff.
    pub relation: Relation,
}

/// Why a changed asset's cost moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDriver {
    /// A component resolves to a different rate.
    RateChanged,
    /// A component's quantity changed.
    UsageChanged,
    /// A component exists only in head.
    ComponentAdded,
    /// A component exists only in base.
    ComponentRemoved,
    /// No component-level cost difference; the configuration or an
    /// upstream dependency changed.
    ConfigurationOnly,
}

/// An added or removed asset with its total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    /// Asset address.
    pub address: String,
    /// Monthly total on the side the asset exists on.
    pub monthly: Decimal,
}

/// A changed asset with drivers and causal chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetChange {
    /// Asset address.
    pub address: String,
    /// Monthly total in base.
    pub base_monthly: Decimal,
    /// Monthly total in head.
    pub head_monthly: Decimal,
    /// head − base.
    pub delta: Decimal,
    /// Component-level change drivers, deduplicated and sorted.
    pub drivers: Vec<ChangeDriver>,
    /// Upstream causes along the dependency path, in path order.
    pub causal_chain: Vec<CausalLink>,
}

/// The change-impact report for two estimations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Input hash of the base estimation.
    pub base_hash: String,
    /// Input hash of the head estimation.
    pub head_hash: String,
    /// Assets only in head, by address.
    pub added: Vec<AssetSummary>,
    /// Assets only in base, by address.
    pub removed: Vec<AssetSummary>,
    /// Assets whose cost or upstream context changed, by address.
    pub changed: Vec<AssetChange>,
    /// Addresses present on both sides with no change.
    pub unchanged: Vec<String>,
    /// head total − base total.
    pub delta_monthly: Decimal,
    /// Signed percent string, e.g. `+12.5%`.
    pub percent: String,
    /// Currency of the totals.
    pub currency: Currency,
    /// head confidence − base confidence.
    pub confidence_delta: f64,
    /// Minimum confidence across the change set; zero when any side
    /// carries symbolic entries.
    pub min_confidence: Confidence,
    /// False when symbolic entries make absolute amounts unreliable.
    pub authoritative_amounts: bool,
}

impl DiffResult {
    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Serializes to the stable report shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "base_hash": self.base_hash,
            "head_hash": self.head_hash,
            "summary": {
                "delta_monthly": self.delta_monthly.to_string(),
                "percent": self.percent,
                "currency": self.currency.code(),
                "added": self.added.len(),
                "removed": self.removed.len(),
                "changed": self.changed.len(),
                "unchanged": self.unchanged.len(),
                "confidence_delta": self.confidence_delta,
                "min_confidence": self.min_confidence.value(),
                "authoritative_amounts": self.authoritative_amounts,
            },
            "added": self.added.iter().map(|a| json!({
                "address": a.address, "monthly": a.monthly.to_string(),
            })).collect::<Vec<_>>(),
            "removed": self.removed.iter().map(|a| json!({
                "address": a.address, "monthly": a.monthly.to_string(),
            })).collect::<Vec<_>>(),
            "changed": self.changed.iter().map(|c| json!({
                "address": c.address,
                "base_monthly": c.base_monthly.to_string(),
                "head_monthly": c.head_monthly.to_string(),
                "delta": c.delta.to_string(),
                "drivers": c.drivers,
                "causal_chain": c.causal_chain,
            })).collect::<Vec<_>>(),
            "unchanged": self.unchanged,
        })
    }
}

// =============================================================================
// COMPUTATION
// =============================================================================

/// Per-side view of one asset, keyed by address.
struct Side<'a> {
    monthly: Decimal,
    units: &'a [CostUnit],
    /// Definition addresses along the dependency path.
    path: Vec<String>,
}

fn collect_sides(result: &EstimationResult) -> BTreeMap<String, Side<'_>> {
    let mut sides = BTreeMap::new();
    for (asset_id, units) in result.cost_graph.iter() {
        let address = result
            .cost_graph
            .address_of(asset_id)
            .unwrap_or(asset_id)
            .to_string();
        let monthly = result.cost_graph.asset_monthly(asset_id).amount;
        let path = units
            .first()
            .map(|u| {
                u.dependency_path
                    .iter()
                    .map(|id| id.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default();
        sides.insert(
            address,
            Side {
                monthly,
                units,
                path,
            },
        );
    }
    sides
}

/// True when `partition_address` is an instance of the definition at
/// `node_address` (equal, or an indexed/keyed expansion of it).
fn instance_of(partition_address: &str, node_address: &str) -> bool {
    partition_address == node_address
        || partition_address
            .strip_prefix(node_address)
            .is_some_and(|rest| rest.starts_with('['))
}

/// Compares two completed estimations.
#[must_use]
pub fn compute_diff(
    base: &EstimationResult,
    head: &EstimationResult,
    config: &DiffConfig,
) -> DiffResult {
    let base_sides = collect_sides(base);
    let head_sides = collect_sides(head);

    let mut added: Vec<AssetSummary> = Vec::new();
    let mut removed: Vec<AssetSummary> = Vec::new();
    let mut candidates: Vec<&String> = Vec::new();

    for (address, side) in &head_sides {
        if !base_sides.contains_key(address) {
            added.push(AssetSummary {
                address: address.clone(),
                monthly: side.monthly,
            });
        }
    }
    for (address, side) in &base_sides {
        if head_sides.contains_key(address) {
            candidates.push(address);
        } else {
            removed.push(AssetSummary {
                address: address.clone(),
                monthly: side.monthly,
            });
        }
    }

    // Pass 1: cost-driven changes at the configured tolerance.
    let mut changed_addresses: BTreeSet<String> = BTreeSet::new();
    for address in &candidates {
        let b = &base_sides[*address];
        let h = &head_sides[*address];
        if beyond_tolerance(b.monthly, h.monthly, config.tolerance) {
            changed_addresses.insert((*address).clone());
        }
    }

    // Pass 2: promote candidates whose upstream context changed, to a
    // fixpoint, since a promoted asset can itself be someone's upstream.
    let touched: Vec<(String, Relation)> = added
        .iter()
        .map(|a| (a.address.clone(), Relation::Added))
        .chain(removed.iter().map(|a| (a.address.clone(), Relation::Removed)))
        .collect();
    loop {
        let mut grew = false;
        for address in &candidates {
            if changed_addresses.contains(*address) {
                continue;
            }
            let head_side = &head_sides[*address];
            let base_side = &base_sides[*address];
            let upstream_touched = upstream_links(
                address,
                &head_side.path,
                &touched,
                &changed_addresses,
            );
            if !upstream_touched.is_empty() || head_side.path != base_side.path {
                changed_addresses.insert((*address).clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    // Assemble changed entries with drivers and causal chains.
    let mut changed: Vec<AssetChange> = Vec::new();
    let mut unchanged: Vec<String> = Vec::new();
    for address in &candidates {
        let b = &base_sides[*address];
        let h = &head_sides[*address];
        if !changed_addresses.contains(*address) {
            unchanged.push((*address).clone());
            continue;
        }
        let mut drivers = classify_drivers(b.units, h.units);
        if drivers.is_empty() {
            drivers.push(ChangeDriver::ConfigurationOnly);
        }
        // Chains cover both sides' paths: a removed upstream asset
        // only appears on the base path.
        let mut combined_path = h.path.clone();
        for node in &b.path {
            if !combined_path.contains(node) {
                combined_path.push(node.clone());
            }
        }
        let causal_chain = upstream_links(address, &combined_path, &touched, &changed_addresses);
        changed.push(AssetChange {
            address: (*address).clone(),
            base_monthly: b.monthly,
            head_monthly: h.monthly,
            delta: h.monthly - b.monthly,
            drivers,
            causal_chain,
        });
    }

    let base_total = base.total_monthly().amount;
    let head_total = head.total_monthly().amount;
    let delta_monthly = head_total - base_total;

    let symbolic_present =
        base.cost_graph.symbolic_count() > 0 || head.cost_graph.symbolic_count() > 0;
    let min_confidence = if symbolic_present {
        Confidence::ZERO
    } else {
        base.confidence().combine_min(head.confidence())
    };

    let result = DiffResult {
        base_hash: base.input_hash.clone(),
        head_hash: head.input_hash.clone(),
        added,
        removed,
        changed,
        unchanged,
        delta_monthly,
        percent: format_percent(delta_monthly, base_total),
        currency: head.cost_graph.currency(),
        confidence_delta: head.confidence().value() - base.confidence().value(),
        min_confidence,
        authoritative_amounts: !symbolic_present,
    };
    debug!(
        added = result.added.len(),
        removed = result.removed.len(),
        changed = result.changed.len(),
        delta = %result.delta_monthly,
        "diff computed"
    );
    result
}

/// Causal links for one asset: every upstream definition on its path
/// that coincides with a touched or changed partition entry.
fn upstream_links(
    own_address: &str,
    path: &[String],
    touched: &[(String, Relation)],
    changed: &BTreeSet<String>,
) -> Vec<CausalLink> {
    let mut links = Vec::new();
    for node_address in path {
        if instance_of(own_address, node_address) {
            continue;
        }
        for (address, relation) in touched {
            if instance_of(address, node_address) {
                links.push(CausalLink {
                    address: address.clone(),
                    relation: *relation,
                });
            }
        }
        for address in changed {
            if address != own_address && instance_of(address, node_address) {
                links.push(CausalLink {
                    address: address.clone(),
                    relation: Relation::Changed,
                });
            }
        }
    }
    links
}

/// Component-level drivers between two unit sets.
fn classify_drivers(base_units: &[CostUnit], head_units: &[CostUnit]) -> Vec<ChangeDriver> {
    let base_by_name: BTreeMap<&str, &CostUnit> =
        base_units.iter().map(|u| (u.name.as_str(), u)).collect();
    let head_by_name: BTreeMap<&str, &CostUnit> =
        head_units.iter().map(|u| (u.name.as_str(), u)).collect();

    let mut drivers: BTreeSet<ChangeDriver> = BTreeSet::new();
    for (name, head_unit) in &head_by_name {
        match base_by_name.get(name) {
            None => {
                drivers.insert(ChangeDriver::ComponentAdded);
            }
            Some(base_unit) => {
                if base_unit.rate_key != head_unit.rate_key {
                    drivers.insert(ChangeDriver::RateChanged);
                } else if base_unit.quantity != head_unit.quantity {
                    drivers.insert(ChangeDriver::UsageChanged);
                } else if base_unit.monthly != head_unit.monthly {
                    // Same key and quantity, different amount: the
                    // snapshot's price moved.
                    drivers.insert(ChangeDriver::RateChanged);
                }
            }
        }
    }
    for name in base_by_name.keys() {
        if !head_by_name.contains_key(name) {
            drivers.insert(ChangeDriver::ComponentRemoved);
        }
    }
    drivers.into_iter().collect()
}

fn beyond_tolerance(base: Decimal, head: Decimal, tolerance: Decimal) -> bool {
    let delta = (head - base).abs();
    if base.is_zero() {
        return !delta.is_zero();
    }
    delta / base.abs() > tolerance
}

/// Signed percent string with one decimal place; `+0.0%` for zero.
fn format_percent(delta: Decimal, base_total: Decimal) -> String {
    if base_total.is_zero() {
        return if delta.is_zero() {
            "+0.0%".to_string()
        } else {
            "n/a".to_string()
        };
    }
    let percent = (delta / base_total * Decimal::from(100)).round_dp(1);
    if percent.is_sign_negative() {
        format!("{percent}%")
    } else {
        format!("+{percent}%")
    }
}
