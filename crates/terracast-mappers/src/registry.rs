//! The mapper registry and tier catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::mapper::{Cloud, ResourceMapper};

// =============================================================================
// TIERS
// =============================================================================

/// Catalog classification of a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTier {
    /// Always or usage-dependently billable; must have a mapper.
    Numeric,
    /// Billable only on usage the configuration cannot supply;
    /// mappers typically emit symbolic units.
    SymbolicExpected,
    /// No direct charge; present in the cost graph for lineage only.
    Indirect,
}

/// One catalog entry: the tier plus the mapper, when the tier allows
/// one.
#[derive(Clone)]
pub struct TierEntry {
    /// Declared tier.
    pub tier: ResourceTier,
    /// The mapper; `None` exactly for indirect resources.
    pub mapper: Option<Arc<dyn ResourceMapper>>,
}

impl std::fmt::Debug for TierEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierEntry")
            .field("tier", &self.tier)
            .field("mapper", &self.mapper.as_ref().map(|m| m.name()))
            .finish()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Validated, immutable mapper table keyed by (cloud, resource type).
///
/// Built once at startup and shared read-only; there is no way to add
/// a mapper to a built registry.
#[derive(Debug)]
pub struct MapperRegistry {
    entries: BTreeMap<(Cloud, String), TierEntry>,
}

impl MapperRegistry {
    /// Starts an empty registry builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            entries: BTreeMap::new(),
            error: None,
        }
    }

    /// Looks up the entry for a resource type.
    #[must_use]
    pub fn lookup(&self, cloud: Cloud, resource_type: &str) -> Option<&TierEntry> {
        self.entries.get(&(cloud, resource_type.to_string()))
    }

    /// True when the resource type is known to the catalog.
    #[must_use]
    pub fn supports(&self, cloud: Cloud, resource_type: &str) -> bool {
        self.lookup(cloud, resource_type).is_some()
    }

    /// Number of catalog entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in registry: the AWS catalog.
    ///
    /// # Panics
    ///
    /// The built-in catalog always validates; a panic here is a bug in
    /// the catalog itself.
    #[must_use]
    pub fn builtin() -> Self {
        crate::aws::register(Self::builder())
            .build()
            .expect("built-in catalog validates")
    }
}

/// Accumulates catalog entries, then validates them as a whole.
pub struct RegistryBuilder {
    entries: BTreeMap<(Cloud, String), TierEntry>,
    error: Option<RegistryError>,
}

impl RegistryBuilder {
    /// Registers a numeric (tier 1) resource type.
    #[must_use]
    pub fn numeric(
        self,
        cloud: Cloud,
        resource_type: &str,
        mapper: Arc<dyn ResourceMapper>,
    ) -> Self {
        self.insert(cloud, resource_type, ResourceTier::Numeric, Some(mapper))
    }

    /// Registers a symbolic-expected (tier 2) resource type.
    #[must_use]
    pub fn symbolic_expected(
        self,
        cloud: Cloud,
        resource_type: &str,
        mapper: Arc<dyn ResourceMapper>,
    ) -> Self {
        self.insert(
            cloud,
            resource_type,
            ResourceTier::SymbolicExpected,
            Some(mapper),
        )
    }

    /// Registers an indirect (tier 3) resource type.
    #[must_use]
    pub fn indirect(self, cloud: Cloud, resource_type: &str) -> Self {
        self.insert(cloud, resource_type, ResourceTier::Indirect, None)
    }

    /// Registers an arbitrary tier/mapper combination. Validation
    /// happens in [`build`](Self::build), so invalid combinations are
    /// representable here and rejected there.
    #[must_use]
    pub fn entry(
        self,
        cloud: Cloud,
        resource_type: &str,
        tier: ResourceTier,
        mapper: Option<Arc<dyn ResourceMapper>>,
    ) -> Self {
        self.insert(cloud, resource_type, tier, mapper)
    }

    fn insert(
        mut self,
        cloud: Cloud,
        resource_type: &str,
        tier: ResourceTier,
        mapper: Option<Arc<dyn ResourceMapper>>,
    ) -> Self {
        let key = (cloud, resource_type.to_string());
        if self.entries.contains_key(&key) && self.error.is_none() {
            self.error = Some(RegistryError::Duplicate {
                cloud,
                resource_type: resource_type.to_string(),
            });
        }
        self.entries.insert(key, TierEntry { tier, mapper });
        self
    }

    /// Validates the catalog and builds the registry.
    ///
    /// Rules: a numeric entry without a mapper behaves like an
    /// indirect one and is invalid; an indirect entry with a mapper
    /// would bill a free resource and is invalid; symbolic-expected
    /// entries need a mapper to produce their symbolic units.
    pub fn build(self) -> RegistryResult<MapperRegistry> {
        if let Some(error) = self.error {
            return Err(error);
        }
        for ((cloud, resource_type), entry) in &self.entries {
            let problem = match (entry.tier, entry.mapper.is_some()) {
                (ResourceTier::Numeric, false) => Some("requires a mapper"),
                (ResourceTier::SymbolicExpected, false) => Some("requires a mapper"),
                (ResourceTier::Indirect, true) => Some("must not have a mapper"),
                _ => None,
            };
            if let Some(problem) = problem {
                return Err(RegistryError::InvalidTier {
                    cloud: *cloud,
                    resource_type: resource_type.clone(),
                    tier: entry.tier,
                    problem,
                });
            }
        }
        debug!(entries = self.entries.len(), "mapper registry validated");
        Ok(MapperRegistry {
            entries: self.entries,
        })
    }
}
