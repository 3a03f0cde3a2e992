//! `aws_s3_bucket` mapper.

use terracast_core::usage::{UsageContext, UsageVector};

use crate::aws::aws_key;
use crate::mapper::{AssetView, ResourceMapper};
use crate::unit::PriceableUnit;

/// Mapper for `aws_s3_bucket`: storage and request volumes from
/// usage; symbolic without them.
pub struct S3BucketMapper;

impl ResourceMapper for S3BucketMapper {
    fn name(&self) -> &'static str {
        "aws_s3_bucket"
    }

    fn build_usage(&self, asset: &AssetView<'_>, ctx: &UsageContext) -> Vec<UsageVector> {
        vec![
            asset.usage_or_symbolic(ctx, "gb_months"),
            asset.usage_or_symbolic(ctx, "monthly_requests"),
        ]
    }

    fn build_cost_units(
        &self,
        asset: &AssetView<'_>,
        usage: &[UsageVector],
    ) -> Vec<PriceableUnit> {
        let storage_class = asset
            .attributes
            .str("storage_class")
            .unwrap_or("standard");

        usage
            .iter()
            .map(|vector| match vector {
                UsageVector::Known {
                    metric,
                    quantity,
                    confidence,
                } => {
                    if metric == "gb_months" {
                        PriceableUnit::numeric(
                            "storage",
                            "gb_month",
                            *quantity,
                            aws_key(asset, "AmazonS3", "Storage")
                                .with_attribute("storage_class", storage_class),
                            *confidence,
                        )
                    } else {
                        PriceableUnit::numeric(
                            "requests",
                            "requests",
                            *quantity,
                            aws_key(asset, "AmazonS3", "API Request")
                                .with_attribute("storage_class", storage_class),
                            *confidence,
                        )
                    }
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

    #[test]
    fn storage_prices_from_profile_default_with_degraded_confidence() {
        let attrs = BTreeMap::new();
        let asset = AssetView {
            address: "aws_s3_bucket.logs",
            resource_type: "aws_s3_bucket",
            region: "us-east-1",
            provider_alias: "default",
            attributes: AttrView::new(&attrs),
        };
        let ctx = UsageContext::new("default").with_default("gb_months", dec!(100));

        let mapper = S3BucketMapper;
        let units = mapper.build_cost_units(&asset, &mapper.build_usage(&asset, &ctx));
        match &units[0] {
            PriceableUnit::Numeric { confidence, .. } => {
                // 0.5 base degraded by the profile-default factor.
                assert!((confidence.value() - 0.4).abs() < 1e-9);
            }
            PriceableUnit::Symbolic { .. } => panic!("expected numeric unit"),
        }
        assert!(units[1].is_symbolic());
    }
}
