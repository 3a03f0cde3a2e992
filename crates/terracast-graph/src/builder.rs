//! Graph construction and sealing.
//!
//! [`GraphBuilder`] is the only mutable graph surface. It is fed either
//! directly (tests) or from a [`ParsedConfig`] via [`from_config`],
//! which normalizes reference strings, emits typed edges, and binds
//! resources to providers. [`seal`] validates and converts to the
//! read-only [`DependencyGraph`].
//!
//! [`from_config`]: GraphBuilder::from_config
//! [`seal`]: GraphBuilder::seal

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

use terracast_core::input::ParsedConfig;

use crate::edge::{DependencyEdge, EdgeKind};
use crate::graph::{Adjacency, DependencyGraph};
use crate::node::{DependencyNode, NodeId, NodeKind};
use crate::reference::normalize_reference;

/// Errors raised while building or sealing a graph.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    /// An edge endpoint does not name a node.
    #[error("Edge endpoint {node} does not exist")]
    MissingEndpoint {
        /// The missing node id.
        node: NodeId,
    },

    /// The graph contains a cycle.
    #[error("Dependency cycle detected at {node}")]
    Cycle {
        /// First node discovered on the cycle.
        node: NodeId,
    },
}

/// A specialized Result type for graph construction.
pub type GraphResult<T> = Result<T, GraphError>;

// =============================================================================
// GRAPH BUILDER
// =============================================================================

/// Mutable accumulator for nodes and edges. Consumed by [`seal`].
///
/// [`seal`]: GraphBuilder::seal
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<NodeId, DependencyNode>,
    edges: BTreeSet<DependencyEdge>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, replacing any previous node with the same id.
    pub fn add_node(&mut self, node: DependencyNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// True when the id already names a node.
    #[must_use]
    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Adds an edge between two existing nodes.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> GraphResult<()> {
        self.add_edge_with_attribute(from, to, kind, None)
    }

    /// Adds an edge tagged with the source attribute name.
    pub fn add_edge_with_attribute(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
        attribute: Option<String>,
    ) -> GraphResult<()> {
        for endpoint in [&from, &to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::MissingEndpoint {
                    node: endpoint.clone(),
                });
            }
        }
        let mut edge = DependencyEdge::new(from, to, kind);
        edge.attribute = attribute;
        self.edges.insert(edge);
        Ok(())
    }

    /// Builds a graph from the parser's normalized output.
    ///
    /// Reference strings that resolve to no declared block are dropped:
    /// the parser may surface references to providers' computed values
    /// or to blocks excluded by the configuration.
    #[must_use]
    pub fn from_config(config: &ParsedConfig) -> Self {
        let mut builder = Self::new();

        // Pass 1: nodes.
        for provider in &config.providers {
            let id = NodeId::provider(&provider.provider_type, provider.alias.as_deref());
            let mut node = DependencyNode::new(id.as_str(), NodeKind::Provider);
            node.location = provider.location.clone();
            builder.add_node(node);
        }
        for resource in &config.resources {
            builder.add_node(
                DependencyNode::new(&resource.address, NodeKind::Resource)
                    .with_resource_type(&resource.resource_type)
                    .with_module_path(resource.module_path.clone())
                    .with_location(resource.location.clone()),
            );
        }
        for data in &config.data_sources {
            builder.add_node(
                DependencyNode::new(&data.address, NodeKind::Data)
                    .with_resource_type(&data.data_type)
                    .with_module_path(data.module_path.clone())
                    .with_location(data.location.clone()),
            );
        }
        for module in &config.modules {
            builder.add_node(
                DependencyNode::new(&module.address, NodeKind::Module)
                    .with_module_path(module.module_path.clone())
                    .with_location(module.location.clone()),
            );
        }
        for (values, kind) in [
            (&config.variables, NodeKind::Variable),
            (&config.locals, NodeKind::Local),
            (&config.outputs, NodeKind::Output),
        ] {
            for value in values {
                builder.add_node(
                    DependencyNode::new(&value.address, kind)
                        .with_module_path(value.module_path.clone())
                        .with_location(value.location.clone()),
                );
            }
        }

        // Pass 2: edges.
        for resource in &config.resources {
            let from = NodeId::new(&resource.address);
            builder.link_depends_on(&from, &resource.depends_on, &resource.module_path);
            builder.link_references(&from, &resource.references, &resource.module_path);
            builder.link_provider(
                &from,
                resource.provider.as_deref(),
                &resource.resource_type,
            );
        }
        for data in &config.data_sources {
            let from = NodeId::new(&data.address);
            builder.link_depends_on(&from, &data.depends_on, &data.module_path);
            builder.link_references(&from, &data.references, &data.module_path);
        }
        for module in &config.modules {
            let from = NodeId::new(&module.address);
            for (input, refs) in &module.references {
                for raw in refs {
                    builder.link_reference(
                        &from,
                        raw,
                        &module.module_path,
                        EdgeKind::ModuleInput,
                        Some(input.clone()),
                    );
                }
            }
        }
        for (values, kind) in [
            (&config.variables, EdgeKind::Reference),
            (&config.locals, EdgeKind::Reference),
            (&config.outputs, EdgeKind::ModuleOutput),
        ] {
            for value in values {
                let from = NodeId::new(&value.address);
                for raw in &value.references {
                    builder.link_reference(&from, raw, &value.module_path, kind, None);
                }
            }
        }

        builder
    }

    fn link_depends_on(&mut self, from: &NodeId, targets: &[String], module_path: &[String]) {
        for target in targets {
            if let Some(to) = self.resolve(target, module_path) {
                let _ = self.add_edge(from.clone(), to, EdgeKind::DependsOn);
            }
        }
    }

    fn link_references(
        &mut self,
        from: &NodeId,
        references: &BTreeMap<String, Vec<String>>,
        module_path: &[String],
    ) {
        for (attribute, refs) in references {
            for raw in refs {
                self.link_reference(
                    from,
                    raw,
                    module_path,
                    EdgeKind::Reference,
                    Some(attribute.clone()),
                );
            }
        }
    }

    fn link_reference(
        &mut self,
        from: &NodeId,
        raw: &str,
        module_path: &[String],
        kind: EdgeKind,
        attribute: Option<String>,
    ) {
        let Some(to) = self.resolve(raw, module_path) else {
            debug!(reference = raw, from = %from, "reference resolves to no node");
            return;
        };
        if to == *from {
            return;
        }
        // References that land on a data block are data_source edges.
        let kind = match self.nodes.get(&to) {
            Some(node) if node.kind == NodeKind::Data && kind == EdgeKind::Reference => {
                EdgeKind::DataSource
            }
            _ => kind,
        };
        let _ = self.add_edge_with_attribute(from.clone(), to, kind, attribute);
    }

    /// Resolves a raw reference from a module context to an existing
    /// node id: module-local candidates first, then root-level.
    fn resolve(&self, raw: &str, module_path: &[String]) -> Option<NodeId> {
        let prefix: String = module_path
            .iter()
            .map(|m| format!("module.{m}."))
            .collect();

        for candidate in normalize_reference(raw) {
            if !prefix.is_empty() {
                let qualified = NodeId::new(format!("{prefix}{candidate}"));
                if self.nodes.contains_key(&qualified) {
                    return Some(qualified);
                }
            }
            let root = NodeId::new(candidate);
            if self.nodes.contains_key(&root) {
                return Some(root);
            }
        }
        None
    }

    fn link_provider(&mut self, from: &NodeId, provider: Option<&str>, resource_type: &str) {
        let id = match provider {
            Some(reference) => {
                let mut parts = reference.splitn(2, '.');
                let ptype = parts.next().unwrap_or_default();
                NodeId::provider(ptype, parts.next())
            }
            // Implicit binding: the type prefix names the provider.
            None => {
                let ptype = resource_type.split('_').next().unwrap_or(resource_type);
                NodeId::provider(ptype, None)
            }
        };
        if self.nodes.contains_key(&id) {
            let _ = self.add_edge(from.clone(), id, EdgeKind::ProviderBinding);
        }
    }

    /// Validates and seals the graph.
    ///
    /// Endpoint existence is guaranteed by construction and re-asserted
    /// here as an invariant; a cycle is a configuration error and
    /// returns [`GraphError::Cycle`] naming the first node found on
    /// one.
    pub fn seal(self) -> GraphResult<DependencyGraph> {
        let Self { nodes, edges } = self;
        let edges: Vec<DependencyEdge> = edges.into_iter().collect();

        let mut deps: Adjacency = BTreeMap::new();
        let mut rdeps: Adjacency = BTreeMap::new();
        for edge in &edges {
            assert!(
                nodes.contains_key(&edge.from) && nodes.contains_key(&edge.to),
                "sealing with dangling edge {} -> {}",
                edge.from,
                edge.to
            );
            deps.entry(edge.from.clone())
                .or_default()
                .insert(edge.to.clone());
            rdeps
                .entry(edge.to.clone())
                .or_default()
                .insert(edge.from.clone());
        }

        let topo_order = toposort(&nodes, &deps)?;

        let roots: Vec<NodeId> = nodes
            .keys()
            .filter(|id| deps.get(*id).map_or(true, BTreeSet::is_empty))
            .cloned()
            .collect();

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            roots = roots.len(),
            "dependency graph sealed"
        );

        Ok(DependencyGraph::new(
            nodes, edges, deps, rdeps, roots, topo_order,
        ))
    }
}

// =============================================================================
// TOPOLOGICAL SORT
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Deterministic three-color DFS producing a dependencies-first order.
/// Node ids are visited in lexicographic order; a gray node on the
/// stack means a cycle.
fn toposort(
    nodes: &BTreeMap<NodeId, DependencyNode>,
    deps: &Adjacency,
) -> GraphResult<Vec<NodeId>> {
    let mut colors: BTreeMap<&NodeId, Color> = nodes.keys().map(|id| (id, Color::White)).collect();
    let mut order: Vec<NodeId> = Vec::with_capacity(nodes.len());

    for id in nodes.keys() {
        if colors[id] == Color::White {
            visit(id, nodes, deps, &mut colors, &mut order)?;
        }
    }
    Ok(order)
}

fn visit<'a>(
    id: &'a NodeId,
    nodes: &'a BTreeMap<NodeId, DependencyNode>,
    deps: &'a Adjacency,
    colors: &mut BTreeMap<&'a NodeId, Color>,
    order: &mut Vec<NodeId>,
) -> GraphResult<()> {
    colors.insert(id, Color::Gray);
    if let Some(targets) = deps.get(id) {
        // BTreeSet iteration is already lexicographic.
        for dep in targets {
            let (dep, _) = nodes
                .get_key_value(dep)
                .expect("adjacency references existing node");
            match colors[dep] {
                Color::White => visit(dep, nodes, deps, colors, order)?,
                Color::Gray => return Err(GraphError::Cycle { node: dep.clone() }),
                Color::Black => {}
            }
        }
    }
    colors.insert(id, Color::Black);
    order.push(id.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use terracast_core::input::{ParsedConfig, ParsedProvider, ParsedResource, ParsedValue};

    use super::*;

    fn resource(address: &str, rtype: &str) -> ParsedResource {
        ParsedResource {
            address: address.to_string(),
            resource_type: rtype.to_string(),
            ..ParsedResource::default()
        }
    }

    #[test]
    fn builds_reference_edges_from_config() {
        let mut web = resource("aws_instance.web", "aws_instance");
        web.references.insert(
            "subnet_id".into(),
            vec!["aws_subnet.main[0].id".to_string()],
        );
        let config = ParsedConfig {
            resources: vec![resource("aws_subnet.main", "aws_subnet"), web],
            ..ParsedConfig::default()
        };

        let graph = GraphBuilder::from_config(&config).seal().unwrap();
        let deps = graph.dependencies(&NodeId::new("aws_instance.web"));
        assert_eq!(deps, vec![NodeId::new("aws_subnet.main")]);
        let edge = graph
            .edges()
            .iter()
            .find(|e| e.kind == EdgeKind::Reference)
            .unwrap();
        assert_eq!(edge.attribute.as_deref(), Some("subnet_id"));
    }

    #[test]
    fn implicit_provider_binding() {
        let config = ParsedConfig {
            providers: vec![ParsedProvider {
                provider_type: "aws".into(),
                ..ParsedProvider::default()
            }],
            resources: vec![resource("aws_instance.web", "aws_instance")],
            ..ParsedConfig::default()
        };
        let graph = GraphBuilder::from_config(&config).seal().unwrap();
        let deps = graph.dependencies(&NodeId::new("aws_instance.web"));
        assert_eq!(deps, vec![NodeId::new("provider.aws")]);
    }

    #[test]
    fn module_local_references_are_qualified() {
        let mut subnet = resource("module.net.aws_subnet.a", "aws_subnet");
        subnet.module_path = vec!["net".into()];
        subnet
            .references
            .insert("vpc_id".into(), vec!["aws_vpc.main.id".to_string()]);
        let mut vpc = resource("module.net.aws_vpc.main", "aws_vpc");
        vpc.module_path = vec!["net".into()];

        let config = ParsedConfig {
            resources: vec![vpc, subnet],
            ..ParsedConfig::default()
        };
        let graph = GraphBuilder::from_config(&config).seal().unwrap();
        let deps = graph.dependencies(&NodeId::new("module.net.aws_subnet.a"));
        assert_eq!(deps, vec![NodeId::new("module.net.aws_vpc.main")]);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut a = resource("aws_instance.a", "aws_instance");
        a.depends_on.push("aws_instance.b".into());
        let mut b = resource("aws_instance.b", "aws_instance");
        b.depends_on.push("aws_instance.a".into());

        let config = ParsedConfig {
            resources: vec![a, b],
            ..ParsedConfig::default()
        };
        let err = GraphBuilder::from_config(&config).seal().unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn edge_to_missing_node_is_refused() {
        let mut builder = GraphBuilder::new();
        builder.add_node(DependencyNode::new("aws_vpc.main", NodeKind::Resource));
        let err = builder
            .add_edge("aws_vpc.main".into(), "aws_subnet.a".into(), EdgeKind::Reference)
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingEndpoint { .. }));
    }

    #[test]
    fn data_source_references_get_typed_edges() {
        let mut web = resource("aws_instance.web", "aws_instance");
        web.references
            .insert("ami".into(), vec!["data.aws_ami.ubuntu.id".to_string()]);
        let config = ParsedConfig {
            resources: vec![web],
            data_sources: vec![terracast_core::input::ParsedDataSource {
                address: "data.aws_ami.ubuntu".into(),
                data_type: "aws_ami".into(),
                ..Default::default()
            }],
            ..ParsedConfig::default()
        };
        let graph = GraphBuilder::from_config(&config).seal().unwrap();
        let edge = graph
            .edges()
            .iter()
            .find(|e| e.to == NodeId::new("data.aws_ami.ubuntu"))
            .unwrap();
        assert_eq!(edge.kind, EdgeKind::DataSource);
    }

    #[test]
    fn output_references_emit_module_output_edges() {
        let config = ParsedConfig {
            resources: vec![resource("aws_vpc.main", "aws_vpc")],
            outputs: vec![ParsedValue {
                address: "output.vpc_id".into(),
                references: vec!["aws_vpc.main.id".into()],
                ..ParsedValue::default()
            }],
            ..ParsedConfig::default()
        };
        let graph = GraphBuilder::from_config(&config).seal().unwrap();
        let edge = graph
            .edges()
            .iter()
            .find(|e| e.from == NodeId::new("output.vpc_id"))
            .unwrap();
        assert_eq!(edge.kind, EdgeKind::ModuleOutput);
    }
}
