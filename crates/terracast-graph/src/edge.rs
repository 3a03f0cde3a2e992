//! Typed dependency edges.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::NodeId;

/// Why one node depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// An attribute expression references the target.
    Reference,
    /// An explicit `depends_on` entry.
    DependsOn,
    /// A module block consumes the target as an input.
    ModuleInput,
    /// An output expression reads the target.
    ModuleOutput,
    /// A resource is bound to a provider configuration.
    ProviderBinding,
    /// A reference whose target is a data source.
    DataSource,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Reference => "reference",
            Self::DependsOn => "depends_on",
            Self::ModuleInput => "module_input",
            Self::ModuleOutput => "module_output",
            Self::ProviderBinding => "provider_binding",
            Self::DataSource => "data_source",
        };
        write!(f, "{s}")
    }
}

/// A directed, typed edge from a dependent node to the node it
/// depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The depending node.
    pub from: NodeId,
    /// The node depended upon.
    pub to: NodeId,
    /// Edge type.
    pub kind: EdgeKind,
    /// Source attribute name, for reference edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl DependencyEdge {
    /// Creates an edge.
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            kind,
            attribute: None,
        }
    }

    /// Tags the edge with the source attribute name.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kind_display() {
        assert_eq!(EdgeKind::ProviderBinding.to_string(), "provider_binding");
        assert_eq!(EdgeKind::DependsOn.to_string(), "depends_on");
    }
}
