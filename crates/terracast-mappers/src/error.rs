//! Error types for registry validation.

use thiserror::Error;

use crate::mapper::Cloud;
use crate::registry::ResourceTier;

/// A specialized Result type for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while building the mapper registry.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// A tier/mapper combination the catalog forbids.
    #[error("{cloud}/{resource_type}: tier {tier:?} {problem}")]
    InvalidTier {
        /// Cloud of the entry.
        cloud: Cloud,
        /// Resource type of the entry.
        resource_type: String,
        /// Declared tier.
        tier: ResourceTier,
        /// What is wrong with the combination.
        problem: &'static str,
    },

    /// The same (cloud, resource type) was registered twice.
    #[error("{cloud}/{resource_type} registered twice")]
    Duplicate {
        /// Cloud of the entry.
        cloud: Cloud,
        /// Resource type of the entry.
        resource_type: String,
    },
}
