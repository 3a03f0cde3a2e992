//! The mapper trait and its input view.

use serde::{Deserialize, Serialize};
use std::fmt;

use rust_decimal::Decimal;

use terracast_core::confidence::Confidence;
use terracast_core::input::AttrView;
use terracast_core::money::HOURS_PER_MONTH;
use terracast_core::usage::{UsageContext, UsageValue, UsageVector};

use crate::unit::PriceableUnit;

/// Base confidence for provisioned-hours components.
pub const HOURS_CONFIDENCE: f64 = 0.95;
/// Base confidence for provisioned-storage components.
pub const STORAGE_CONFIDENCE: f64 = 0.9;
/// Base confidence for usage-dependent components.
pub const USAGE_CONFIDENCE: f64 = 0.5;

// =============================================================================
// CLOUD
// =============================================================================

/// Cloud provider a mapper belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    /// Amazon Web Services.
    Aws,
    /// Google Cloud Platform.
    Google,
    /// Microsoft Azure.
    Azure,
}

impl Cloud {
    /// The provider string used in rate keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Google => "google",
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ASSET VIEW
// =============================================================================

/// What a mapper sees of an expanded asset instance.
///
/// The engine constructs this from its own asset type; mappers depend
/// only on this view, which keeps them pure and independently
/// testable.
#[derive(Debug, Clone, Copy)]
pub struct AssetView<'a> {
    /// Instance address, e.g. `aws_instance.web[0]`.
    pub address: &'a str,
    /// Resource type, e.g. `aws_instance`.
    pub resource_type: &'a str,
    /// Region from the frozen provider binding.
    pub region: &'a str,
    /// Alias from the frozen provider binding.
    pub provider_alias: &'a str,
    /// Typed window onto the instance attributes.
    pub attributes: AttrView<'a>,
}

impl<'a> AssetView<'a> {
    /// Looks up a usage metric for this asset, scoped-first.
    #[must_use]
    pub fn usage<'c>(&self, ctx: &'c UsageContext, metric: &str) -> Option<&'c UsageValue> {
        ctx.lookup(self.address, metric)
    }

    /// A known monthly-hours vector: the context's `monthly_hours`
    /// override when present, otherwise the full month.
    #[must_use]
    pub fn monthly_hours(&self, ctx: &UsageContext) -> UsageVector {
        let base = Confidence::new(HOURS_CONFIDENCE);
        match self.usage(ctx, "monthly_hours") {
            Some(value) => UsageVector::known(
                "monthly_hours",
                value.quantity,
                value.adjust_confidence(base),
            ),
            None => UsageVector::known("monthly_hours", Decimal::from(HOURS_PER_MONTH), base),
        }
    }

    /// A usage-dependent vector for `metric`: known when the context
    /// supplies a value, symbolic otherwise.
    #[must_use]
    pub fn usage_or_symbolic(&self, ctx: &UsageContext, metric: &str) -> UsageVector {
        match self.usage(ctx, metric) {
            Some(value) => UsageVector::known(
                metric,
                value.quantity,
                value.adjust_confidence(Confidence::new(USAGE_CONFIDENCE)),
            ),
            None => UsageVector::symbolic(
                metric,
                format!("usage metric {metric} not provided for {}", self.address),
            ),
        }
    }
}

// =============================================================================
// RESOURCE MAPPER
// =============================================================================

/// Per-resource-type mapping from attributes to usage and cost units.
///
/// Both functions are pure; mappers hold no state and never perform
/// I/O. A mapper that needs usage data consults the context and emits
/// a symbolic unit when the value is absent; defaulting to zero or
/// guessing is forbidden.
pub trait ResourceMapper: Send + Sync {
    /// Stable mapper name for lineage records.
    fn name(&self) -> &'static str;

    /// Derives the usage vectors for one asset.
    fn build_usage(&self, asset: &AssetView<'_>, ctx: &UsageContext) -> Vec<UsageVector>;

    /// Turns usage vectors into priceable units.
    fn build_cost_units(
        &self,
        asset: &AssetView<'_>,
        usage: &[UsageVector],
    ) -> Vec<PriceableUnit>;
}
