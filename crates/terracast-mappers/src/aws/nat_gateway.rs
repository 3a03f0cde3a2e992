//! `aws_nat_gateway` mapper.

use terracast_core::usage::{UsageContext, UsageVector};

use crate::aws::aws_key;
use crate::mapper::{AssetView, ResourceMapper};
use crate::unit::PriceableUnit;

/// Mapper for `aws_nat_gateway`: provisioned hours plus processed
/// traffic from usage.
pub struct NatGatewayMapper;

impl ResourceMapper for NatGatewayMapper {
    fn name(&self) -> &'static str {
        "aws_nat_gateway"
    }

    fn build_usage(&self, asset: &AssetView<'_>, ctx: &UsageContext) -> Vec<UsageVector> {
        vec![
            asset.monthly_hours(ctx),
            asset.usage_or_symbolic(ctx, "monthly_gb_data_processed"),
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
                } if metric == "monthly_hours" => PriceableUnit::numeric(
                    "gateway_hours",
                    "hours",
                    *quantity,
                    aws_key(asset, "AmazonEC2", "NAT Gateway")
                        .with_attribute("usagetype", "hours"),
                    *confidence,
                ),
                UsageVector::Known {
                    quantity,
                    confidence,
                    ..
                } => PriceableUnit::numeric(
                    "data_processed",
                    "gb",
                    *quantity,
                    aws_key(asset, "AmazonEC2", "NAT Gateway")
                        .with_attribute("usagetype", "gb_processed"),
                    *confidence,
                ),
                UsageVector::Symbolic { metric, reason } => {
                    PriceableUnit::symbolic(metric.clone(), reason.clone())
                }
            })
            .collect()
    }
}
