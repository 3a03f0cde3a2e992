//! # Terracast Engine
//!
//! The estimation pipeline: a parsed configuration plus a pricing
//! snapshot in, a priced dependency graph out.
//!
//! ## Phases
//!
//! The orchestrator drives five phases in a fixed order, asserting the
//! ordering between them:
//!
//! 1. **Envelope**: the normalized request (built by `terracast-core`).
//! 2. **Graph**: build and seal the dependency graph.
//! 3. **Providers**: freeze (provider, alias) → region bindings.
//! 4. **Expansion**: turn each definition into instances or a
//!    symbolic bucket. Unknown cardinality never becomes a guess.
//! 5. **Derivation**: run mappers, resolve rates, stamp dependency
//!    paths, and propagate confidence pessimistically.
//!
//! Phase-ordering violations are bugs and panic; recoverable
//! conditions surface as [`EstimateError`].
//!
//! [`EstimateError`]: terracast_core::error::EstimateError

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod asset;
pub mod context;
pub mod cost;
pub mod derive;
pub mod estimator;
pub mod expand;
pub mod phase;
pub mod pool;
pub mod provider;
pub mod result;

pub use asset::{AssetInstance, InstanceKey};
pub use context::{CancelSignal, EngineConfig};
pub use cost::{CostGraph, CostUnit, Lineage, SymbolicBucket, Warning};
pub use estimator::Estimator;
pub use expand::{Cardinality, Expansion};
pub use phase::EnginePhase;
pub use pool::{ProgressSnapshot, ProgressTracker};
pub use provider::{EnvironmentHints, FrozenProvider, FrozenProviders, ProviderKey};
pub use result::EstimationResult;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::asset::{AssetInstance, InstanceKey};
    pub use crate::context::{CancelSignal, EngineConfig};
    pub use crate::cost::{CostGraph, CostUnit, SymbolicBucket, Warning};
    pub use crate::estimator::Estimator;
    pub use crate::provider::{EnvironmentHints, FrozenProviders, ProviderKey};
    pub use crate::result::EstimationResult;
}
