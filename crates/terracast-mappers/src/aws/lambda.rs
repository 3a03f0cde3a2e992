//! `aws_lambda_function` mapper.
//!
//! Fully usage-dependent (tier 2): without request and duration
//! volumes there is no number to compute, and both components surface
//! as symbolic units.

use terracast_core::usage::{UsageContext, UsageVector};

use crate::aws::aws_key;
use crate::mapper::{AssetView, ResourceMapper};
use crate::unit::PriceableUnit;

/// Mapper for `aws_lambda_function`.
pub struct LambdaFunctionMapper;

impl ResourceMapper for LambdaFunctionMapper {
    fn name(&self) -> &'static str {
        "aws_lambda_function"
    }

    fn build_usage(&self, asset: &AssetView<'_>, ctx: &UsageContext) -> Vec<UsageVector> {
        vec![
            asset.usage_or_symbolic(ctx, "monthly_requests"),
            asset.usage_or_symbolic(ctx, "monthly_gb_seconds"),
        ]
    }

    fn build_cost_units(
        &self,
        asset: &AssetView<'_>,
        usage: &[UsageVector],
    ) -> Vec<PriceableUnit> {
        usage
            .iter()
            .map(|vector| match vector {
                UsageVector::Known {
                    metric,
                    quantity,
                    confidence,
                } => {
                    let (name, unit, group) = if metric == "monthly_requests" {
                        ("requests", "requests", "requests")
                    } else {
                        ("duration", "gb_seconds", "duration")
                    };
                    PriceableUnit::numeric(
                        name,
                        unit,
                        *quantity,
                        aws_key(asset, "AWSLambda", "Serverless").with_attribute("group", group),
                        *confidence,
                    )
                }
                UsageVector::Symbolic { metric, reason } => {
                    PriceableUnit::symbolic(metric.clone(), reason.clone())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use terracast_core::input::AttrView;

    fn asset(attrs: &BTreeMap<String, serde_json::Value>) -> AssetView<'_> {
        AssetView {
            address: "aws_lambda_function.api",
            resource_type: "aws_lambda_function",
            region: "us-east-1",
            provider_alias: "default",
            attributes: AttrView::new(attrs),
        }
    }

    #[test]
    fn fully_symbolic_without_usage() {
        let attrs = BTreeMap::new();
        let view = asset(&attrs);
        let ctx = UsageContext::new("default");

        let mapper = LambdaFunctionMapper;
        let units = mapper.build_cost_units(&view, &mapper.build_usage(&view, &ctx));
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(PriceableUnit::is_symbolic));
    }

    #[test]
    fn prices_with_explicit_usage() {
        let attrs = BTreeMap::new();
        let view = asset(&attrs);
        let ctx = UsageContext::new("default")
            .with_explicit("monthly_requests", dec!(1000000))
            .with_explicit("monthly_gb_seconds", dec!(40000));

        let mapper = LambdaFunctionMapper;
        let units = mapper.build_cost_units(&view, &mapper.build_usage(&view, &ctx));
        assert!(units.iter().all(|u| !u.is_symbolic()));
    }
}
