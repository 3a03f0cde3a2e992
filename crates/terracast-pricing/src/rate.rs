//! Rates and tier bounds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use terracast_core::confidence::Confidence;
use terracast_core::money::Currency;

/// Quantity bounds of a tiered rate: the rate applies to the portion
/// of the quantity in `(start, end]`; an open `end` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBounds {
    /// Exclusive lower bound.
    pub start: Decimal,
    /// Inclusive upper bound; `None` for the top tier.
    pub end: Option<Decimal>,
}

impl TierBounds {
    /// Creates tier bounds.
    #[must_use]
    pub fn new(start: Decimal, end: Option<Decimal>) -> Self {
        Self { start, end }
    }
}

/// One line item of a pricing snapshot. Never mutated after the
/// snapshot seals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Billing unit, canonical (`hours`, `gb_month`, `requests`).
    pub unit: String,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Currency of the price.
    pub currency: Currency,
    /// Tier bounds, for tiered pricing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierBounds>,
    /// Confidence score of the catalog source.
    pub source_confidence: Confidence,
}

impl Rate {
    /// Creates an untiered rate with full source confidence.
    #[must_use]
    pub fn new(unit: impl Into<String>, unit_price: Decimal, currency: Currency) -> Self {
        Self {
            unit: unit.into(),
            unit_price,
            currency,
            tier: None,
            source_confidence: Confidence::CERTAIN,
        }
    }

    /// Sets tier bounds.
    #[must_use]
    pub fn with_tier(mut self, tier: TierBounds) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Sets the source confidence.
    #[must_use]
    pub fn with_source_confidence(mut self, confidence: Confidence) -> Self {
        self.source_confidence = confidence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tiered_rate_roundtrips_through_json() {
        let rate = Rate::new("gb_month", dec!(0.023), Currency::Usd)
            .with_tier(TierBounds::new(dec!(0), Some(dec!(51200))));
        let json = serde_json::to_string(&rate).unwrap();
        let back: Rate = serde_json::from_str(&json).unwrap();
        assert_eq!(rate, back);
    }
}
