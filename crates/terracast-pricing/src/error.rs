//! Error types for pricing lookups.

use thiserror::Error;

/// A specialized Result type for pricing operations.
pub type PricingResult<T> = Result<T, PricingError>;

/// The main error type for pricing operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// A rate lookup omitted the provider alias.
    #[error("Rate lookup without a provider alias: {key}")]
    MissingAlias {
        /// Canonical form of the offending key.
        key: String,
    },

    /// A fallback plan names an attribute that must never be dropped.
    #[error("Fallback plan may not drop {attribute}")]
    InvalidFallback {
        /// The protected attribute.
        attribute: String,
    },
}

impl PricingError {
    /// Creates a missing-alias error.
    #[must_use]
    pub fn missing_alias(key: impl Into<String>) -> Self {
        Self::MissingAlias { key: key.into() }
    }
}
