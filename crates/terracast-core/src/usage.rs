//! Usage vectors and the usage context.
//!
//! Usage is what the configuration cannot tell us: request volumes,
//! stored bytes, processed traffic. Callers supply a [`UsageContext`]
//! (explicit overrides plus profile defaults). When a required metric
//! is absent the mapper emits a symbolic vector with a reason, never
//! a zero, never a guess.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::confidence::Confidence;

/// Confidence factor applied when a usage value came from a profile
/// default rather than an explicit override.
pub const DEFAULT_USAGE_DEGRADATION: f64 = 0.8;

// =============================================================================
// USAGE VECTOR
// =============================================================================

/// One usage metric for one asset: a known quantity, or the reason it
/// is unknowable pre-apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageVector {
    /// A resolved quantity, e.g. `monthly_hours = 730`.
    Known {
        /// Metric name (`monthly_hours`, `monthly_requests`, `gb_months`, ...).
        metric: String,
        /// The quantity.
        quantity: Decimal,
        /// Confidence in the quantity.
        confidence: Confidence,
    },
    /// The quantity cannot be known before apply.
    Symbolic {
        /// Metric name.
        metric: String,
        /// Why the quantity is unknowable.
        reason: String,
    },
}

impl UsageVector {
    /// Creates a known usage vector.
    #[must_use]
    pub fn known(metric: impl Into<String>, quantity: Decimal, confidence: Confidence) -> Self {
        Self::Known {
            metric: metric.into(),
            quantity,
            confidence,
        }
    }

    /// Creates a symbolic usage vector.
    #[must_use]
    pub fn symbolic(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Symbolic {
            metric: metric.into(),
            reason: reason.into(),
        }
    }

    /// The metric name.
    #[must_use]
    pub fn metric(&self) -> &str {
        match self {
            Self::Known { metric, .. } | Self::Symbolic { metric, .. } => metric,
        }
    }
}

// =============================================================================
// USAGE CONTEXT
// =============================================================================

/// Where a usage value came from. Defaults degrade confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    /// Explicitly supplied by the caller for this estimation.
    Explicit,
    /// Taken from the usage profile's defaults.
    ProfileDefault,
}

/// One usage value with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageValue {
    /// The quantity.
    pub quantity: Decimal,
    /// Whether this was explicit or a profile default.
    pub source: UsageSource,
}

impl UsageValue {
    /// An explicit caller-supplied value.
    #[must_use]
    pub fn explicit(quantity: Decimal) -> Self {
        Self {
            quantity,
            source: UsageSource::Explicit,
        }
    }

    /// A profile default.
    #[must_use]
    pub fn default_value(quantity: Decimal) -> Self {
        Self {
            quantity,
            source: UsageSource::ProfileDefault,
        }
    }

    /// Applies provenance to a mapper's base confidence.
    #[must_use]
    pub fn adjust_confidence(&self, base: Confidence) -> Confidence {
        match self.source {
            UsageSource::Explicit => base,
            UsageSource::ProfileDefault => base.degrade(DEFAULT_USAGE_DEGRADATION),
        }
    }
}

/// Usage values for one estimation, keyed by `<address>.<metric>` with
/// a plain `<metric>` fallback for profile-wide defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageContext {
    /// Usage profile tag this context was built from.
    pub profile: String,
    /// Values keyed by scoped or bare metric name.
    pub values: BTreeMap<String, UsageValue>,
}

impl UsageContext {
    /// Creates an empty context for a profile tag.
    #[must_use]
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            values: BTreeMap::new(),
        }
    }

    /// Adds an explicit value for a bare or scoped metric key.
    #[must_use]
    pub fn with_explicit(mut self, key: impl Into<String>, quantity: Decimal) -> Self {
        self.values
            .insert(key.into(), UsageValue::explicit(quantity));
        self
    }

    /// Adds a profile default for a bare or scoped metric key.
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, quantity: Decimal) -> Self {
        self.values
            .insert(key.into(), UsageValue::default_value(quantity));
        self
    }

    /// Looks up a metric for an asset address: the scoped key wins,
    /// then the bare metric, then nothing.
    #[must_use]
    pub fn lookup(&self, address: &str, metric: &str) -> Option<&UsageValue> {
        self.values
            .get(&format!("{address}.{metric}"))
            .or_else(|| self.values.get(metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scoped_key_wins_over_bare() {
        let ctx = UsageContext::new("default")
            .with_default("monthly_requests", dec!(1000000))
            .with_explicit("aws_lambda_function.api.monthly_requests", dec!(250000));

        let v = ctx
            .lookup("aws_lambda_function.api", "monthly_requests")
            .unwrap();
        assert_eq!(v.quantity, dec!(250000));
        assert_eq!(v.source, UsageSource::Explicit);

        let w = ctx
            .lookup("aws_lambda_function.worker", "monthly_requests")
            .unwrap();
        assert_eq!(w.source, UsageSource::ProfileDefault);
    }

    #[test]
    fn default_source_degrades_confidence() {
        let base = Confidence::new(0.5);
        let explicit = UsageValue::explicit(dec!(1)).adjust_confidence(base);
        let defaulted = UsageValue::default_value(dec!(1)).adjust_confidence(base);
        assert_eq!(explicit.value(), 0.5);
        assert!((defaulted.value() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn absent_metric_is_none() {
        let ctx = UsageContext::new("default");
        assert!(ctx.lookup("aws_s3_bucket.logs", "gb_months").is_none());
    }
}
