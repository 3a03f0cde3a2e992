//! The estimation result and its JSON shape.
//!
//! Amounts serialize as decimal strings; floats appear only for
//! confidence scores. Key order inside each object is fixed by
//! construction, so two runs over the same inputs serialize
//! byte-identically apart from the timestamp and duration metadata.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::time::Duration;

use terracast_core::confidence::{Confidence, ConfidenceLevel};
use terracast_core::envelope::{EnvelopeOptions, EstimationMode};
use terracast_core::money::Money;
use terracast_graph::{DependencyGraph, NodeId};

use crate::cost::{CostGraph, CostUnit, Warning};

/// Version tag of the result JSON shape.
const API_VERSION: &str = "v1";

// =============================================================================
// GRAPH EXPORT
// =============================================================================

/// Dependency-graph excerpt included when the envelope requests it.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphExport {
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

impl GraphExport {
    /// Extracts the export from a sealed graph.
    #[must_use]
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| {
                json!({
                    "id": node.id.as_str(),
                    "kind": node.kind.to_string(),
                    "resource_type": node.resource_type,
                })
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|edge| {
                json!({
                    "from": edge.from.as_str(),
                    "to": edge.to.as_str(),
                    "kind": edge.kind.to_string(),
                    "attribute": edge.attribute,
                })
            })
            .collect();
        Self { nodes, edges }
    }
}

// =============================================================================
// ESTIMATION RESULT
// =============================================================================

/// The complete output of one estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult {
    /// The envelope's input hash.
    pub input_hash: String,
    /// Mode the estimation ran under.
    pub mode: EstimationMode,
    /// Engine crate version.
    pub engine_version: String,
    /// Id of the pricing snapshot used.
    pub snapshot_id: String,
    /// Content hash of the pricing snapshot used.
    pub snapshot_hash: String,
    /// The priced cost graph.
    pub cost_graph: CostGraph,
    /// Non-fatal conditions, in discovery order.
    pub warnings: Vec<Warning>,
    /// Output-shaping flags from the envelope.
    pub options: EnvelopeOptions,
    /// Graph export, when the envelope requested one.
    pub graph_export: Option<GraphExport>,
    /// Wall-clock completion time.
    pub generated_at: DateTime<Utc>,
    /// Estimation duration.
    pub duration: Duration,
}

impl EstimationResult {
    /// Aggregate monthly total over non-symbolic units.
    #[must_use]
    pub fn total_monthly(&self) -> Money {
        self.cost_graph.total_monthly()
    }

    /// Aggregate hourly total over non-symbolic units.
    #[must_use]
    pub fn total_hourly(&self) -> Money {
        self.cost_graph.total_hourly()
    }

    /// Pessimistic aggregate confidence.
    #[must_use]
    pub fn confidence(&self) -> Confidence {
        self.cost_graph.min_confidence()
    }

    /// Coarse confidence tag.
    #[must_use]
    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence().level()
    }

    /// Serializes to the stable result shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let summary = json!({
            "monthly": self.total_monthly().to_decimal_string(),
            "hourly": self.total_hourly().to_decimal_string(),
            "currency": self.cost_graph.currency().code(),
            "confidence": self.confidence().value(),
            "confidence_level": self.confidence_level().to_string(),
            "resource_count": self.cost_graph.asset_count(),
            "symbolic_count": self.cost_graph.symbolic_count(),
        });

        // Per-resource entries sorted by address.
        let mut resources: Vec<(String, Value)> = self
            .cost_graph
            .iter()
            .map(|(asset_id, units)| {
                let address = self
                    .cost_graph
                    .address_of(asset_id)
                    .unwrap_or(asset_id)
                    .to_string();
                let monthly = self.cost_graph.asset_monthly(asset_id);
                let confidence = Confidence::min_of(units.iter().map(|u| u.confidence));
                let mut entry = json!({
                    "address": address,
                    "monthly": monthly.to_decimal_string(),
                    "hourly": monthly.monthly_to_hourly().to_decimal_string(),
                    "confidence": confidence.value(),
                });
                let object = entry.as_object_mut().expect("entry is an object");
                if self.options.include_components {
                    object.insert(
                        "components".to_string(),
                        Value::Array(units.iter().map(component_json).collect()),
                    );
                }
                if self.options.include_dependency_graph {
                    if let Some(path) = units.first().map(|u| &u.dependency_path) {
                        object.insert("dependency_path".to_string(), path_json(path));
                    }
                }
                (address, entry)
            })
            .collect();
        resources.sort_by(|a, b| a.0.cmp(&b.0));

        let symbolic: Vec<Value> = self
            .cost_graph
            .buckets()
            .iter()
            .map(|bucket| {
                json!({
                    "address": bucket.address,
                    "reason": bucket.reason,
                    "expression": bucket.expression,
                    "cardinality": bucket.cardinality,
                    "lower_bound": bucket.lower_bound,
                    "upper_bound": bucket.upper_bound,
                    "unbounded": bucket.unbounded,
                })
            })
            .collect();

        let mut root = json!({
            "metadata": {
                "api_version": API_VERSION,
                "input_hash": self.input_hash,
                "engine_version": self.engine_version,
                "snapshot_id": self.snapshot_id,
                "snapshot_hash": self.snapshot_hash,
                "mode": self.mode.to_string(),
                "timestamp": self.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                "duration_ms": self.duration.as_millis() as u64,
            },
            "summary": summary,
            "resources": resources.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
            "symbolic": symbolic,
            "warnings": self.warnings,
        });

        if let Some(export) = &self.graph_export {
            let object = root.as_object_mut().expect("root is an object");
            object.insert(
                "dependency_graph".to_string(),
                json!({
                    "nodes": export.nodes,
                    "edges": export.edges,
                }),
            );
        }
        root
    }
}

fn component_json(unit: &CostUnit) -> Value {
    let mut value = json!({
        "name": unit.name,
        "monthly": unit.monthly.to_decimal_string(),
        "hourly": unit.hourly.to_decimal_string(),
        "confidence": unit.confidence.value(),
        "symbolic": unit.symbolic,
    });
    let object = value.as_object_mut().expect("component is an object");
    if let Some(quantity) = &unit.quantity {
        object.insert("quantity".to_string(), json!(quantity.to_string()));
    }
    if let Some(measurement) = &unit.unit {
        object.insert("unit".to_string(), json!(measurement));
    }
    if let Some(rate_key) = &unit.rate_key {
        object.insert("rate_key".to_string(), json!(rate_key));
    }
    if let Some(reason) = &unit.reason {
        object.insert("reason".to_string(), json!(reason));
    }
    if let Some(lineage) = &unit.lineage {
        object.insert("lineage".to_string(), json!(lineage));
    }
    value
}

fn path_json(path: &[NodeId]) -> Value {
    Value::Array(path.iter().map(|id| json!(id.as_str())).collect())
}
