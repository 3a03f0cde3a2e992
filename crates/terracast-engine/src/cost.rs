//! Cost units, symbolic buckets, and the cost graph.
//!
//! A [`CostUnit`] is one priced component of one asset, stamped with
//! the dependency path from a graph root to that asset. A
//! [`SymbolicBucket`] is a cost the engine refuses to fabricate a
//! number for. The [`CostGraph`] indexes both for aggregation and for
//! the diff engine's closure queries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use terracast_core::confidence::Confidence;
use terracast_core::hashing::short_id;
use terracast_core::money::{Currency, Money};
use terracast_graph::NodeId;

// =============================================================================
// LINEAGE
// =============================================================================

/// How a cost unit's number came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    /// Where the quantity came from
    /// (`provisioned`, `usage:explicit`, `usage:profile_default`).
    pub usage_source: String,
    /// Canonical form of the rate key that matched.
    pub rate_key: String,
    /// Human-readable formula, e.g. `0.0104/hours x 730`.
    pub formula: String,
    /// Content hash of the pricing snapshot used.
    pub snapshot_hash: String,
}

// =============================================================================
// COST UNIT
// =============================================================================

/// A priced component of one asset instance.
///
/// Constructed only through [`CostUnit::numeric`] and
/// [`CostUnit::symbolic`], which maintain the invariant that symbolic
/// units have zero amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostUnit {
    /// Unit id, stable per (asset, component name).
    pub id: String,
    /// Owning asset id.
    pub asset_id: String,
    /// Owning asset address.
    pub asset_address: String,
    /// Component name, e.g. `compute_hours`.
    pub name: String,
    /// Dependency path from a graph root to the asset's node;
    /// non-empty by construction.
    pub dependency_path: Vec<NodeId>,
    /// Canonical rate key used, for numeric units.
    pub rate_key: Option<String>,
    /// Quantity priced, for numeric units.
    pub quantity: Option<Decimal>,
    /// Measurement unit of the quantity.
    pub unit: Option<String>,
    /// Monthly amount; zero when symbolic.
    pub monthly: Money,
    /// Hourly amount; zero when symbolic.
    pub hourly: Money,
    /// Confidence; zero when symbolic.
    pub confidence: Confidence,
    /// True when the component could not be priced.
    pub symbolic: bool,
    /// Why the component has no number, when symbolic.
    pub reason: Option<String>,
    /// Lineage, when requested.
    pub lineage: Option<Lineage>,
}

impl CostUnit {
    /// Creates a numeric cost unit.
    ///
    /// # Panics
    ///
    /// Panics when the dependency path is empty; every asset lies on
    /// a path from some root.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn numeric(
        asset_id: &str,
        asset_address: &str,
        name: &str,
        dependency_path: Vec<NodeId>,
        rate_key: String,
        quantity: Decimal,
        unit: &str,
        monthly: Money,
        confidence: Confidence,
    ) -> Self {
        assert!(
            !dependency_path.is_empty(),
            "cost unit {asset_address}/{name} has an empty dependency path"
        );
        let hourly = monthly.monthly_to_hourly();
        Self {
            id: short_id(format!("{asset_id}|{name}").as_bytes()),
            asset_id: asset_id.to_string(),
            asset_address: asset_address.to_string(),
            name: name.to_string(),
            dependency_path,
            rate_key: Some(rate_key),
            quantity: Some(quantity),
            unit: Some(unit.to_string()),
            monthly,
            hourly,
            confidence,
            symbolic: false,
            reason: None,
            lineage: None,
        }
    }

    /// Creates a symbolic cost unit: zero amounts, zero confidence.
    #[must_use]
    pub fn symbolic(
        asset_id: &str,
        asset_address: &str,
        name: &str,
        dependency_path: Vec<NodeId>,
        reason: impl Into<String>,
        currency: Currency,
    ) -> Self {
        assert!(
            !dependency_path.is_empty(),
            "cost unit {asset_address}/{name} has an empty dependency path"
        );
        Self {
            id: short_id(format!("{asset_id}|{name}").as_bytes()),
            asset_id: asset_id.to_string(),
            asset_address: asset_address.to_string(),
            name: name.to_string(),
            dependency_path,
            rate_key: None,
            quantity: None,
            unit: None,
            monthly: Money::zero(currency),
            hourly: Money::zero(currency),
            confidence: Confidence::ZERO,
            symbolic: true,
            reason: Some(reason.into()),
            lineage: None,
        }
    }

    /// Creates the zero-cost lineage unit for indirect resources.
    #[must_use]
    pub fn zero_cost(
        asset_id: &str,
        asset_address: &str,
        dependency_path: Vec<NodeId>,
        currency: Currency,
    ) -> Self {
        assert!(
            !dependency_path.is_empty(),
            "cost unit {asset_address} has an empty dependency path"
        );
        Self {
            id: short_id(format!("{asset_id}|indirect").as_bytes()),
            asset_id: asset_id.to_string(),
            asset_address: asset_address.to_string(),
            name: "indirect".to_string(),
            dependency_path,
            rate_key: None,
            quantity: None,
            unit: None,
            monthly: Money::zero(currency),
            hourly: Money::zero(currency),
            confidence: Confidence::CERTAIN,
            symbolic: false,
            reason: None,
            lineage: None,
        }
    }

    /// Attaches lineage.
    #[must_use]
    pub fn with_lineage(mut self, lineage: Lineage) -> Self {
        self.lineage = Some(lineage);
        self
    }

    /// The node this unit's path ends at.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        self.dependency_path
            .last()
            .expect("dependency path is non-empty")
    }
}

// =============================================================================
// SYMBOLIC BUCKET
// =============================================================================

/// Cardinality state recorded on a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityState {
    /// Cardinality is unknowable pre-apply.
    Unknown,
    /// Cardinality is bounded but not fixed.
    Range,
}

/// A cost that cannot be numerically resolved at the definition level
/// (unknown cardinality, or a definition-wide usage gap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicBucket {
    /// Definition address the bucket stands in for.
    pub address: String,
    /// Why no instances could be expanded.
    pub reason: String,
    /// The originating expression text.
    pub expression: String,
    /// Cardinality state.
    pub cardinality: CardinalityState,
    /// Lower bound on the instance count, when stated.
    pub lower_bound: Option<u64>,
    /// Upper bound on the instance count, when stated.
    pub upper_bound: Option<u64>,
    /// True when no upper bound exists.
    pub unbounded: bool,
    /// Always zero.
    pub confidence: Confidence,
}

impl SymbolicBucket {
    /// Creates an unknown-cardinality bucket.
    #[must_use]
    pub fn unknown(
        address: impl Into<String>,
        reason: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            reason: reason.into(),
            expression: expression.into(),
            cardinality: CardinalityState::Unknown,
            lower_bound: None,
            upper_bound: None,
            unbounded: true,
            confidence: Confidence::ZERO,
        }
    }

    /// Creates a range bucket preserving stated bounds.
    #[must_use]
    pub fn range(
        address: impl Into<String>,
        reason: impl Into<String>,
        expression: impl Into<String>,
        lower: Option<u64>,
        upper: Option<u64>,
    ) -> Self {
        Self {
            address: address.into(),
            reason: reason.into(),
            expression: expression.into(),
            cardinality: CardinalityState::Range,
            lower_bound: lower,
            upper_bound: upper,
            unbounded: upper.is_none(),
            confidence: Confidence::ZERO,
        }
    }
}

// =============================================================================
// WARNINGS
// =============================================================================

/// A non-fatal condition surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable warning code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Address the warning concerns, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Warning {
    /// Creates a warning.
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>, address: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            address,
        }
    }
}

// =============================================================================
// COST GRAPH
// =============================================================================

/// All cost units of one estimation, indexed by asset and by
/// dependency node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostGraph {
    /// Units grouped by owning asset id, assets in id order.
    units_by_asset: BTreeMap<String, Vec<CostUnit>>,
    /// Unit ids grouped by dependency node, for closure queries.
    units_by_node: BTreeMap<NodeId, Vec<String>>,
    /// Asset address per asset id (diff keys on addresses).
    addresses: BTreeMap<String, String>,
    /// Symbolic buckets, in address order.
    buckets: Vec<SymbolicBucket>,
    /// Currency of every amount in the graph.
    currency: Currency,
}

impl CostGraph {
    /// Creates an empty cost graph.
    #[must_use]
    pub fn new(currency: Currency) -> Self {
        Self {
            units_by_asset: BTreeMap::new(),
            units_by_node: BTreeMap::new(),
            addresses: BTreeMap::new(),
            buckets: Vec::new(),
            currency,
        }
    }

    /// The graph's currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Inserts the units of one asset.
    pub fn insert_asset(&mut self, asset_id: &str, asset_address: &str, units: Vec<CostUnit>) {
        for unit in &units {
            self.units_by_node
                .entry(unit.node_id().clone())
                .or_default()
                .push(unit.id.clone());
        }
        self.addresses
            .insert(asset_id.to_string(), asset_address.to_string());
        self.units_by_asset.insert(asset_id.to_string(), units);
    }

    /// Adds a symbolic bucket, keeping address order.
    pub fn add_bucket(&mut self, bucket: SymbolicBucket) {
        let at = self
            .buckets
            .partition_point(|b| b.address <= bucket.address);
        self.buckets.insert(at, bucket);
    }

    /// Asset ids in order.
    pub fn asset_ids(&self) -> impl Iterator<Item = &String> {
        self.units_by_asset.keys()
    }

    /// The address of an asset.
    #[must_use]
    pub fn address_of(&self, asset_id: &str) -> Option<&str> {
        self.addresses.get(asset_id).map(String::as_str)
    }

    /// Units of one asset.
    #[must_use]
    pub fn units_of(&self, asset_id: &str) -> &[CostUnit] {
        self.units_by_asset
            .get(asset_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates `(asset id, units)` in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<CostUnit>)> {
        self.units_by_asset.iter()
    }

    /// All units in asset order.
    pub fn all_units(&self) -> impl Iterator<Item = &CostUnit> {
        self.units_by_asset.values().flatten()
    }

    /// The symbolic buckets.
    #[must_use]
    pub fn buckets(&self) -> &[SymbolicBucket] {
        &self.buckets
    }

    /// Unit ids attached to a dependency node.
    #[must_use]
    pub fn units_at_node(&self, node: &NodeId) -> &[String] {
        self.units_by_node
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Monthly total of one asset over its non-symbolic units.
    #[must_use]
    pub fn asset_monthly(&self, asset_id: &str) -> Money {
        let mut total = Money::zero(self.currency);
        for unit in self.units_of(asset_id) {
            if !unit.symbolic {
                total += unit.monthly;
            }
        }
        total
    }

    /// Graph-level monthly total over non-symbolic units.
    #[must_use]
    pub fn total_monthly(&self) -> Money {
        let mut total = Money::zero(self.currency);
        for unit in self.all_units() {
            if !unit.symbolic {
                total += unit.monthly;
            }
        }
        total
    }

    /// Graph-level hourly total over non-symbolic units.
    #[must_use]
    pub fn total_hourly(&self) -> Money {
        let mut total = Money::zero(self.currency);
        for unit in self.all_units() {
            if !unit.symbolic {
                total += unit.hourly;
            }
        }
        total
    }

    /// Pessimistic confidence over every unit and bucket: the minimum,
    /// and zero as soon as anything symbolic exists.
    #[must_use]
    pub fn min_confidence(&self) -> Confidence {
        let units = Confidence::min_of(self.all_units().map(|u| u.confidence));
        if self.buckets.is_empty() {
            units
        } else {
            Confidence::ZERO
        }
    }

    /// Number of priced assets.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.units_by_asset.len()
    }

    /// Number of symbolic entries: buckets plus symbolic units.
    #[must_use]
    pub fn symbolic_count(&self) -> usize {
        self.buckets.len() + self.all_units().filter(|u| u.symbolic).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn path() -> Vec<NodeId> {
        vec![NodeId::new("aws_instance.web")]
    }

    #[test]
    fn symbolic_units_have_zero_amounts() {
        let unit = CostUnit::symbolic(
            "abcd",
            "aws_instance.web",
            "compute_hours",
            path(),
            "no rate",
            Currency::Usd,
        );
        assert!(unit.symbolic);
        assert!(unit.monthly.is_zero());
        assert!(unit.hourly.is_zero());
        assert_eq!(unit.confidence, Confidence::ZERO);
    }

    #[test]
    #[should_panic(expected = "empty dependency path")]
    fn empty_path_is_rejected() {
        let _ = CostUnit::zero_cost("abcd", "aws_subnet.a", Vec::new(), Currency::Usd);
    }

    #[test]
    fn totals_skip_symbolic_units() {
        let mut graph = CostGraph::new(Currency::Usd);
        let numeric = CostUnit::numeric(
            "a1",
            "aws_instance.web[0]",
            "compute_hours",
            path(),
            "key".into(),
            dec!(730),
            "hours",
            Money::new(dec!(7.5920), Currency::Usd),
            Confidence::new(0.95),
        );
        let symbolic = CostUnit::symbolic(
            "a1",
            "aws_instance.web[0]",
            "data",
            path(),
            "no usage",
            Currency::Usd,
        );
        graph.insert_asset("a1", "aws_instance.web[0]", vec![numeric, symbolic]);

        assert_eq!(graph.total_monthly().amount, dec!(7.5920));
        assert_eq!(graph.min_confidence(), Confidence::ZERO);
        assert_eq!(graph.symbolic_count(), 1);
        // Both units index under the definition node.
        assert_eq!(graph.units_at_node(&NodeId::new("aws_instance.web")).len(), 2);
    }

    #[test]
    fn buckets_zero_the_confidence() {
        let mut graph = CostGraph::new(Currency::Usd);
        graph.insert_asset(
            "a1",
            "aws_instance.web[0]",
            vec![CostUnit::numeric(
                "a1",
                "aws_instance.web[0]",
                "compute_hours",
                path(),
                "key".into(),
                dec!(730),
                "hours",
                Money::new(dec!(7.5920), Currency::Usd),
                Confidence::new(0.95),
            )],
        );
        assert!(graph.min_confidence().value() > 0.9);
        graph.add_bucket(SymbolicBucket::unknown(
            "aws_instance.workers",
            "for_each is unknown",
            "for_each = module.cfg.worker_names",
        ));
        assert_eq!(graph.min_confidence(), Confidence::ZERO);
    }

    #[test]
    fn buckets_stay_sorted_by_address() {
        let mut graph = CostGraph::new(Currency::Usd);
        graph.add_bucket(SymbolicBucket::unknown("b.b", "r", "e"));
        graph.add_bucket(SymbolicBucket::unknown("a.a", "r", "e"));
        let addresses: Vec<&str> = graph.buckets().iter().map(|b| b.address.as_str()).collect();
        assert_eq!(addresses, vec!["a.a", "b.b"]);
    }
}
