//! The sealed dependency graph.
//!
//! A [`DependencyGraph`] only comes out of [`GraphBuilder::seal`],
//! which has already validated edge endpoints and rejected cycles.
//! Every query is deterministic: adjacency is stored in sorted maps
//! and closure results are returned in sorted or topological order.
//!
//! [`GraphBuilder::seal`]: crate::builder::GraphBuilder::seal

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::edge::DependencyEdge;
use crate::node::{DependencyNode, NodeId};

/// Sorted adjacency: node id to neighbor ids.
pub(crate) type Adjacency = BTreeMap<NodeId, BTreeSet<NodeId>>;

// =============================================================================
// DEPENDENCY GRAPH
// =============================================================================

/// A sealed, read-only dependency graph.
pub struct DependencyGraph {
    pub(crate) nodes: BTreeMap<NodeId, DependencyNode>,
    pub(crate) edges: Vec<DependencyEdge>,
    /// `deps[a]` contains `b` when `a` depends on `b`.
    pub(crate) deps: Adjacency,
    /// `rdeps[b]` contains `a` when `a` depends on `b`.
    pub(crate) rdeps: Adjacency,
    /// Nodes with no dependencies, in id order.
    pub(crate) roots: Vec<NodeId>,
    /// Dependencies-first topological order.
    pub(crate) topo_order: Vec<NodeId>,
    /// Memoized forward closures.
    dependents_cache: RwLock<BTreeMap<NodeId, Vec<NodeId>>>,
    /// Memoized root-to-node paths.
    path_cache: RwLock<BTreeMap<NodeId, Vec<NodeId>>>,
}

impl DependencyGraph {
    pub(crate) fn new(
        nodes: BTreeMap<NodeId, DependencyNode>,
        edges: Vec<DependencyEdge>,
        deps: Adjacency,
        rdeps: Adjacency,
        roots: Vec<NodeId>,
        topo_order: Vec<NodeId>,
    ) -> Self {
        Self {
            nodes,
            edges,
            deps,
            rdeps,
            roots,
            topo_order,
            dependents_cache: RwLock::new(BTreeMap::new()),
            path_cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    /// True when the id names a node of this graph.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// All edges.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes with no dependencies, in id order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Dependencies-first topological order over all nodes.
    #[must_use]
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Direct dependencies of a node, in id order.
    #[must_use]
    pub fn dependencies(&self, id: &NodeId) -> Vec<NodeId> {
        self.deps
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Direct dependents of a node, in id order.
    #[must_use]
    pub fn dependents(&self, id: &NodeId) -> Vec<NodeId> {
        self.rdeps
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Transitive dependents of a node (the forward closure), in id
    /// order. Memoized.
    #[must_use]
    pub fn transitive_dependents(&self, id: &NodeId) -> Vec<NodeId> {
        if let Some(cached) = self.dependents_cache.read().get(id) {
            return cached.clone();
        }

        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack: Vec<NodeId> = self.dependents(id);
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                stack.extend(self.dependents(&next));
            }
        }
        let closure: Vec<NodeId> = seen.into_iter().collect();

        self.dependents_cache
            .write()
            .insert(id.clone(), closure.clone());
        closure
    }

    /// The upstream closure of a node in root→node order, ending with
    /// the node itself. Used to stamp cost units with their dependency
    /// path. Memoized.
    #[must_use]
    pub fn path_from_root(&self, id: &NodeId) -> Vec<NodeId> {
        if let Some(cached) = self.path_cache.read().get(id) {
            return cached.clone();
        }

        // Ancestor set: everything the node transitively depends on.
        let mut ancestors: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack: Vec<NodeId> = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if ancestors.insert(next.clone()) {
                stack.extend(self.dependencies(&next));
            }
        }

        // The cached topological order is dependencies-first, so
        // filtering it by the ancestor set yields root→id order with
        // the node itself last.
        let path: Vec<NodeId> = self
            .topo_order
            .iter()
            .filter(|n| ancestors.contains(*n))
            .cloned()
            .collect();
        debug_assert_eq!(path.last(), Some(id), "path must end at the node");

        self.path_cache.write().insert(id.clone(), path.clone());
        path
    }

    /// Nodes grouped by dependency depth: level 0 has no dependencies,
    /// level n+1 depends only on levels ≤ n. Each level is in id
    /// order. Derivation dispatches one level at a time.
    #[must_use]
    pub fn levels(&self) -> Vec<Vec<NodeId>> {
        let mut depth: BTreeMap<&NodeId, usize> = BTreeMap::new();
        for id in &self.topo_order {
            let d = self
                .deps
                .get(id)
                .map(|deps| {
                    deps.iter()
                        .map(|dep| depth.get(dep).copied().unwrap_or(0) + 1)
                        .max()
                        .unwrap_or(0)
                })
                .unwrap_or(0);
            depth.insert(id, d);
        }

        let max_depth = depth.values().copied().max().unwrap_or(0);
        let mut levels: Vec<Vec<NodeId>> = vec![Vec::new(); max_depth + 1];
        for (id, d) in depth {
            levels[d].push(id.clone());
        }
        levels.retain(|level| !level.is_empty());
        levels
    }

    /// Statistics for logging.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            root_count: self.roots.len(),
        }
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("roots", &self.roots)
            .finish()
    }
}

// =============================================================================
// GRAPH STATISTICS
// =============================================================================

/// Summary statistics about a sealed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of edges.
    pub edge_count: usize,
    /// Number of roots (nodes with no dependencies).
    pub root_count: usize,
}
