//! The expansion gate: cardinality classification and instance
//! emission.
//!
//! For every definition the gate decides how many instances exist. A
//! literal or fully evaluated `count`/`for_each` expands to exactly
//! that many instances with deterministic keys. Anything unknowable
//! pre-apply (data-source references, module outputs, impure
//! functions, null evaluation) becomes a [`SymbolicBucket`] in
//! permissive mode or an `UnknownCardinality` error in strict mode.
//!
//! The gate never defaults an unknown count to one, never fabricates
//! placeholder instances, and never trades a bucket for a degraded
//! confidence score. Those behaviors are tested as properties, not
//! just reviewed.

use serde_json::Value;

use terracast_core::error::{EstimateError, EstimateResult};
use terracast_core::envelope::EstimationMode;
use terracast_core::input::{AttributeMap, Expression};

use crate::asset::{AssetInstance, InstanceKey};
use crate::cost::SymbolicBucket;
use crate::provider::FrozenProvider;
use terracast_graph::NodeId;

/// Function calls whose results differ between plan and apply.
const IMPURE_FUNCTIONS: &[&str] = &["templatefile", "fileset", "file", "timestamp", "uuid"];

// =============================================================================
// CARDINALITY
// =============================================================================

/// The classified cardinality of one definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Cardinality {
    /// Instance keys are fully determined (possibly zero of them).
    Known(Vec<InstanceKey>),
    /// The instance count is unknowable pre-apply.
    Unknown {
        /// Why it is unknowable.
        reason: String,
    },
    /// The count is bounded but not fixed. Expands like `Unknown`,
    /// preserving the bounds on the bucket.
    Range {
        /// Why it is not fixed.
        reason: String,
        /// Stated lower bound.
        lower: Option<u64>,
        /// Stated upper bound.
        upper: Option<u64>,
    },
}

/// Classifies a `count` expression.
#[must_use]
pub fn classify_count(expr: &Expression) -> Cardinality {
    match &expr.value {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) if n >= 0 => Cardinality::Known((0..n as u64).map(InstanceKey::Int).collect()),
            _ => Cardinality::Unknown {
                reason: format!("count evaluates to a non-integer ({n})"),
            },
        },
        Some(Value::Null) => Cardinality::Unknown {
            reason: "count evaluates to null, so the instance count is unknown before apply"
                .to_string(),
        },
        Some(other) => Cardinality::Unknown {
            reason: format!("count evaluates to a non-numeric value ({other})"),
        },
        None => {
            if let Ok(n) = expr.raw.trim().parse::<u64>() {
                return Cardinality::Known((0..n).map(InstanceKey::Int).collect());
            }
            Cardinality::Unknown {
                reason: format!(
                    "count is unknown before apply: {}",
                    unknown_source(&expr.raw)
                ),
            }
        }
    }
}

/// Classifies a `for_each` expression. Keys are sorted so expansion
/// order is deterministic.
#[must_use]
pub fn classify_for_each(expr: &Expression) -> Cardinality {
    match &expr.value {
        Some(Value::Object(map)) => {
            let mut keys: Vec<InstanceKey> = map
                .keys()
                .map(|k| InstanceKey::String(k.clone()))
                .collect();
            keys.sort();
            Cardinality::Known(keys)
        }
        Some(Value::Array(items)) => {
            let mut keys: Vec<InstanceKey> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .map(InstanceKey::String)
                .collect();
            keys.sort();
            keys.dedup();
            Cardinality::Known(keys)
        }
        Some(Value::Null) => Cardinality::Unknown {
            reason: "for_each evaluates to null, so the instance set is unknown before apply"
                .to_string(),
        },
        Some(other) => Cardinality::Unknown {
            reason: format!("for_each evaluates to a non-collection value ({other})"),
        },
        None => Cardinality::Unknown {
            reason: format!(
                "for_each is unknown before apply: {}",
                unknown_source(&expr.raw)
            ),
        },
    }
}

/// Names the reason an unevaluated expression cannot be known.
fn unknown_source(raw: &str) -> String {
    if raw.contains("data.") {
        return format!("`{raw}` references a data source");
    }
    if raw.contains("module.") {
        return format!("`{raw}` references a module output");
    }
    for function in IMPURE_FUNCTIONS {
        if raw.contains(&format!("{function}(")) {
            return format!("`{raw}` calls the impure function {function}");
        }
    }
    format!("`{raw}` contains unresolvable references")
}

// =============================================================================
// EXPANSION
// =============================================================================

/// The gate's outcome for one definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// Concrete instances; may be empty for `count = 0`.
    Instances(Vec<AssetInstance>),
    /// Cardinality could not be resolved; nothing was instantiated.
    Bucket(SymbolicBucket),
}

/// Expands one resource definition.
///
/// In strict mode an unknown cardinality aborts with
/// `UnknownCardinality`; in permissive mode it produces exactly one
/// bucket and zero instances.
pub fn expand_definition(
    definition_id: &NodeId,
    resource_type: &str,
    count: Option<&Expression>,
    for_each: Option<&Expression>,
    attributes: &AttributeMap,
    provider: &FrozenProvider,
    mode: EstimationMode,
) -> EstimateResult<Expansion> {
    let (cardinality, expression) = match (count, for_each) {
        (Some(expr), _) => (classify_count(expr), expr.raw.clone()),
        (None, Some(expr)) => (classify_for_each(expr), expr.raw.clone()),
        (None, None) => (
            Cardinality::Known(vec![InstanceKey::None]),
            String::new(),
        ),
    };

    match cardinality {
        Cardinality::Known(keys) => {
            let instances = keys
                .into_iter()
                .map(|key| {
                    AssetInstance::new(
                        definition_id.clone(),
                        resource_type,
                        key,
                        provider.clone(),
                        attributes.clone(),
                    )
                })
                .collect();
            Ok(Expansion::Instances(instances))
        }
        Cardinality::Unknown { reason } => {
            if mode.is_strict() {
                return Err(EstimateError::unknown_cardinality(
                    definition_id.as_str(),
                    expression,
                ));
            }
            Ok(Expansion::Bucket(SymbolicBucket::unknown(
                definition_id.as_str(),
                reason,
                expression,
            )))
        }
        Cardinality::Range {
            reason,
            lower,
            upper,
        } => {
            if mode.is_strict() {
                return Err(EstimateError::unknown_cardinality(
                    definition_id.as_str(),
                    expression,
                ));
            }
            Ok(Expansion::Bucket(SymbolicBucket::range(
                definition_id.as_str(),
                reason,
                expression,
                lower,
                upper,
            )))
        }
    }
}
