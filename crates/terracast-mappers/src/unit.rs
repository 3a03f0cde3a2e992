//! Priceable units: the mapper's output.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use terracast_core::confidence::Confidence;
use terracast_pricing::RateKey;

/// A priced (or symbolically unpriced) component of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceableUnit {
    /// A numeric component: quantity × rate.
    Numeric {
        /// Component name, e.g. `compute_hours`, `storage_gb`.
        name: String,
        /// Measurement unit, matching the rate's unit.
        unit: String,
        /// Monthly quantity in that unit.
        quantity: Decimal,
        /// Rate key to resolve against the snapshot.
        rate_key: RateKey,
        /// Mapper-declared confidence, usage provenance applied.
        confidence: Confidence,
    },
    /// A component whose cost cannot be numerically resolved.
    Symbolic {
        /// Component name.
        name: String,
        /// Why the component has no number.
        reason: String,
    },
}

impl PriceableUnit {
    /// Creates a numeric unit.
    #[must_use]
    pub fn numeric(
        name: impl Into<String>,
        unit: impl Into<String>,
        quantity: Decimal,
        rate_key: RateKey,
        confidence: Confidence,
    ) -> Self {
        Self::Numeric {
            name: name.into(),
            unit: unit.into(),
            quantity,
            rate_key,
            confidence,
        }
    }

    /// Creates a symbolic unit.
    #[must_use]
    pub fn symbolic(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Symbolic {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The component name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. } | Self::Symbolic { name, .. } => name,
        }
    }

    /// True for symbolic units.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic { .. })
    }
}
