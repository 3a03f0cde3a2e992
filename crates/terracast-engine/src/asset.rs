//! Expanded asset instances.

use serde::{Deserialize, Serialize};
use std::fmt;

use terracast_core::hashing::short_id;
use terracast_core::input::AttributeMap;
use terracast_graph::NodeId;

use crate::provider::FrozenProvider;

// =============================================================================
// INSTANCE KEY
// =============================================================================

/// The per-instance key produced by expansion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InstanceKey {
    /// A singleton definition.
    None,
    /// A `count` index.
    Int(u64),
    /// A `for_each` key.
    String(String),
}

impl InstanceKey {
    /// Stable encoding used in instance-id hashes.
    #[must_use]
    fn encode(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Appends the key to a base address
    /// (`base[i]` / `base["key"]` / `base`).
    #[must_use]
    pub fn address(&self, base: &str) -> String {
        match self {
            Self::None => base.to_string(),
            Self::Int(i) => format!("{base}[{i}]"),
            Self::String(s) => format!("{base}[\"{s}\"]"),
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "-"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

// =============================================================================
// ASSET INSTANCE
// =============================================================================

/// One realized instance of a resource definition.
///
/// Every instance references exactly one sealed dependency node: the
/// definition it was expanded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInstance {
    /// Stable instance id: first 16 hex chars of
    /// SHA-256(definition id, instance key).
    pub id: String,
    /// Id of the definition's dependency node.
    pub definition_id: NodeId,
    /// Instance address, e.g. `aws_instance.web[0]`.
    pub address: String,
    /// Resource type.
    pub resource_type: String,
    /// The instance key.
    pub key: InstanceKey,
    /// Frozen provider binding.
    pub provider: FrozenProvider,
    /// Attribute map from the definition.
    pub attributes: AttributeMap,
}

impl AssetInstance {
    /// Creates an instance for a definition and key.
    #[must_use]
    pub fn new(
        definition_id: NodeId,
        resource_type: impl Into<String>,
        key: InstanceKey,
        provider: FrozenProvider,
        attributes: AttributeMap,
    ) -> Self {
        let id = short_id(format!("{definition_id}|{}", key.encode()).as_bytes());
        let address = key.address(definition_id.as_str());
        Self {
            id,
            definition_id,
            address,
            resource_type: resource_type.into(),
            key,
            provider,
            attributes,
        }
    }
}
