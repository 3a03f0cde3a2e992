//! # Terracast Graph
//!
//! The dependency graph is the authoritative backbone of estimation:
//! asset expansion walks it, cost units are stamped with paths through
//! it, and the diff engine explains changes by traversing it.
//!
//! The API enforces the build/seal split at the type level:
//! [`GraphBuilder`] is the only mutable surface, and [`seal`] consumes
//! it, validates every edge endpoint, rejects cycles, and returns a
//! read-only [`DependencyGraph`]. There is no way to mutate a sealed
//! graph short of rebuilding it.
//!
//! [`seal`]: GraphBuilder::seal

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod builder;
pub mod edge;
pub mod graph;
pub mod node;
pub mod reference;

pub use builder::{GraphBuilder, GraphError, GraphResult};
pub use edge::{DependencyEdge, EdgeKind};
pub use graph::{DependencyGraph, GraphStats};
pub use node::{DependencyNode, NodeId, NodeKind};
pub use reference::normalize_reference;
