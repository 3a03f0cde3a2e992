//! Provider finalization.
//!
//! Provider blocks are frozen into an immutable map of
//! (type, alias) → region + configuration. Finalization requires the
//! sealed dependency graph, because provider bindings are graph nodes
//! referenced by resource nodes; the function signature enforces that
//! ordering.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use terracast_core::input::{AttributeMap, ParsedProvider};
use terracast_graph::{DependencyGraph, NodeId};

/// Region used when neither the block, the hints, nor the environment
/// name one.
const FALLBACK_REGION: &str = "us-east-1";

// =============================================================================
// PROVIDER KEY
// =============================================================================

/// Identity of a provider configuration: (type, alias).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProviderKey {
    /// Provider type, e.g. `aws`.
    pub provider_type: String,
    /// Alias; `None` for the default configuration.
    pub alias: Option<String>,
}

impl ProviderKey {
    /// Creates a key.
    #[must_use]
    pub fn new(provider_type: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            alias,
        }
    }

    /// Parses `aws` or `aws.west` references.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        let mut parts = reference.splitn(2, '.');
        let provider_type = parts.next().unwrap_or_default().to_string();
        Self {
            provider_type,
            alias: parts.next().map(str::to_string),
        }
    }

    /// The graph node id of this provider.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        NodeId::provider(&self.provider_type, self.alias.as_deref())
    }

    /// The alias string used in rate keys (`default` when none).
    #[must_use]
    pub fn alias_or_default(&self) -> &str {
        self.alias.as_deref().unwrap_or("default")
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}.{alias}", self.provider_type),
            None => write!(f, "{}", self.provider_type),
        }
    }
}

// =============================================================================
// FROZEN PROVIDER
// =============================================================================

/// One finalized provider binding. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenProvider {
    /// Identity.
    pub key: ProviderKey,
    /// Resolved region.
    pub region: String,
    /// Remaining configuration, frozen as-is.
    pub config: AttributeMap,
}

// =============================================================================
// ENVIRONMENT HINTS
// =============================================================================

/// Caller-supplied region defaults used when a provider block does not
/// declare a region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentHints {
    /// Per-provider-type default regions.
    pub default_regions: BTreeMap<String, String>,
    /// A single default applied to every provider type.
    pub default_region: Option<String>,
}

impl EnvironmentHints {
    /// Resolves the region for a provider type.
    #[must_use]
    fn region_for(&self, provider_type: &str) -> Option<&str> {
        self.default_regions
            .get(provider_type)
            .or(self.default_region.as_ref())
            .map(String::as_str)
    }
}

// =============================================================================
// FROZEN PROVIDERS
// =============================================================================

/// The immutable (provider-key → binding) map.
///
/// There is deliberately no insertion method: [`finalize`] is the only
/// constructor, and it runs after graph sealing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenProviders {
    bindings: BTreeMap<ProviderKey, FrozenProvider>,
}

impl FrozenProviders {
    /// Looks up a binding by key.
    #[must_use]
    pub fn get(&self, key: &ProviderKey) -> Option<&FrozenProvider> {
        self.bindings.get(key)
    }

    /// Resolves the binding for a resource: its explicit provider
    /// reference, or the default configuration of the type implied by
    /// the resource type prefix.
    #[must_use]
    pub fn binding_for(
        &self,
        provider_ref: Option<&str>,
        resource_type: &str,
    ) -> Option<&FrozenProvider> {
        let key = match provider_ref {
            Some(reference) => ProviderKey::parse(reference),
            None => {
                let ptype = resource_type.split('_').next().unwrap_or(resource_type);
                ProviderKey::new(ptype, None)
            }
        };
        self.bindings.get(&key)
    }

    /// Resolves a binding like [`binding_for`], falling back to the
    /// provider type's default configuration when an aliased
    /// reference names no block, and to a synthesized default-region
    /// binding as the last resort.
    ///
    /// [`binding_for`]: Self::binding_for
    #[must_use]
    pub fn resolve_binding(
        &self,
        provider_ref: Option<&str>,
        resource_type: &str,
    ) -> FrozenProvider {
        if let Some(binding) = self.binding_for(provider_ref, resource_type) {
            return binding.clone();
        }
        let provider_type = match provider_ref {
            Some(reference) => ProviderKey::parse(reference).provider_type,
            None => resource_type
                .split('_')
                .next()
                .unwrap_or(resource_type)
                .to_string(),
        };
        if let Some(binding) = self.bindings.get(&ProviderKey::new(&provider_type, None)) {
            return binding.clone();
        }
        let key = ProviderKey::new(provider_type, None);
        FrozenProvider {
            key,
            region: FALLBACK_REGION.to_string(),
            config: AttributeMap::new(),
        }
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no providers were finalized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProviderKey, &FrozenProvider)> {
        self.bindings.iter()
    }
}

/// Freezes provider blocks into an immutable binding map.
///
/// Region resolution order: the block's own `region`, then the
/// caller's hints, then a fixed fallback. Provider types that
/// resources imply but no block declares get an implicit default
/// binding, so every asset can be stamped with a region and alias.
///
/// The `graph` parameter is the ordering invariant made explicit:
/// only a sealed graph exists, so finalization cannot run earlier.
#[must_use]
pub fn finalize(
    providers: &[ParsedProvider],
    graph: &DependencyGraph,
    hints: &EnvironmentHints,
) -> FrozenProviders {
    let mut bindings: BTreeMap<ProviderKey, FrozenProvider> = BTreeMap::new();

    for block in providers {
        let key = ProviderKey::new(&block.provider_type, block.alias.clone());
        let region = block
            .region
            .clone()
            .or_else(|| hints.region_for(&block.provider_type).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_REGION.to_string());
        bindings.insert(
            key.clone(),
            FrozenProvider {
                key,
                region,
                config: block.config.clone(),
            },
        );
    }

    // Implicit default bindings for provider types only resources name.
    let implied: BTreeSet<String> = graph
        .nodes()
        .filter_map(|node| node.resource_type.as_deref())
        .map(|rt| rt.split('_').next().unwrap_or(rt).to_string())
        .collect();
    for provider_type in implied {
        let key = ProviderKey::new(&provider_type, None);
        bindings.entry(key.clone()).or_insert_with(|| {
            let region = hints
                .region_for(&provider_type)
                .unwrap_or(FALLBACK_REGION)
                .to_string();
            FrozenProvider {
                key,
                region,
                config: AttributeMap::new(),
            }
        });
    }

    debug!(bindings = bindings.len(), "provider bindings frozen");
    FrozenProviders { bindings }
}
