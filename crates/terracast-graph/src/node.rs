//! Dependency graph nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use terracast_core::input::SourceLocation;

// =============================================================================
// NODE IDENTIFIER
// =============================================================================

/// Stable identifier of a dependency node.
///
/// For configuration blocks this is the fully module-qualified
/// Terraform address (`module.net.aws_subnet.a`); provider nodes use
/// `provider.<type>` or `provider.<type>.<alias>`. Ids order
/// lexicographically, which every deterministic traversal relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Id of a provider node.
    #[must_use]
    pub fn provider(provider_type: &str, alias: Option<&str>) -> Self {
        match alias {
            Some(alias) => Self(format!("provider.{provider_type}.{alias}")),
            None => Self(format!("provider.{provider_type}")),
        }
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// NODE KIND
// =============================================================================

/// What kind of configuration block a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A `resource` block.
    Resource,
    /// A `data` block.
    Data,
    /// A `module` block.
    Module,
    /// A `provider` block.
    Provider,
    /// A `variable` block.
    Variable,
    /// A `locals` entry.
    Local,
    /// An `output` block.
    Output,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resource => "resource",
            Self::Data => "data",
            Self::Module => "module",
            Self::Provider => "provider",
            Self::Variable => "variable",
            Self::Local => "local",
            Self::Output => "output",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// DEPENDENCY NODE
// =============================================================================

/// One node of the dependency graph. Immutable after sealing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Stable id; the node's identity.
    pub id: NodeId,
    /// Block kind.
    pub kind: NodeKind,
    /// Terraform address (equal to the id for block nodes).
    pub address: String,
    /// Module path from the root; empty for the root module.
    pub module_path: Vec<String>,
    /// Resource or data source type, when applicable.
    pub resource_type: Option<String>,
    /// Source position.
    pub location: SourceLocation,
}

impl DependencyNode {
    /// Creates a node whose id equals its address.
    #[must_use]
    pub fn new(address: impl Into<String>, kind: NodeKind) -> Self {
        let address = address.into();
        Self {
            id: NodeId::new(address.clone()),
            kind,
            address,
            module_path: Vec::new(),
            resource_type: None,
            location: SourceLocation::default(),
        }
    }

    /// Sets the resource type.
    #[must_use]
    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Sets the module path.
    #[must_use]
    pub fn with_module_path(mut self, module_path: Vec<String>) -> Self {
        self.module_path = module_path;
        self
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }
}
