//! `aws_instance` mapper.
//!
//! Bills compute hours by instance type. A root block device is billed
//! as EBS storage only when the configuration sizes it explicitly;
//! the implicit AMI-derived root volume has no knowable size
//! pre-apply.

use rust_decimal::Decimal;

use terracast_core::confidence::Confidence;
use terracast_core::usage::{UsageContext, UsageVector};

use crate::aws::aws_key;
use crate::mapper::{AssetView, ResourceMapper, STORAGE_CONFIDENCE};
use crate::unit::PriceableUnit;

/// Mapper for `aws_instance`.
pub struct Ec2InstanceMapper;

impl ResourceMapper for Ec2InstanceMapper {
    fn name(&self) -> &'static str {
        "aws_instance"
    }

    fn build_usage(&self, asset: &AssetView<'_>, ctx: &UsageContext) -> Vec<UsageVector> {
        vec![asset.monthly_hours(ctx)]
    }

    fn build_cost_units(
        &self,
        asset: &AssetView<'_>,
        usage: &[UsageVector],
    ) -> Vec<PriceableUnit> {
        let Some(instance_type) = asset.attributes.str("instance_type") else {
            return vec![PriceableUnit::symbolic(
                "compute_hours",
                "instance_type is not a literal value",
            )];
        };

        let mut units = Vec::new();

        for vector in usage {
            match vector {
                UsageVector::Known {
                    metric,
                    quantity,
                    confidence,
                } if metric == "monthly_hours" => {
                    let key = aws_key(asset, "AmazonEC2", "Compute Instance")
                        .with_attribute("instance_type", instance_type)
                        .with_attribute(
                            "os",
                            asset.attributes.str("operating_system").unwrap_or("linux"),
                        )
                        .with_attribute(
                            "tenancy",
                            asset.attributes.str("tenancy").unwrap_or("shared"),
                        );
                    units.push(PriceableUnit::numeric(
                        "compute_hours",
                        "hours",
                        *quantity,
                        key,
                        *confidence,
                    ));
                }
                UsageVector::Known { .. } => {}
                UsageVector::Symbolic { metric, reason } => {
                    units.push(PriceableUnit::symbolic(metric.clone(), reason.clone()));
                }
            }
        }

        // Explicitly sized root volume bills as storage.
        if let Some(size) = asset.attributes.int("root_volume_size") {
            let volume_type = asset
                .attributes
                .str("root_volume_type")
                .unwrap_or("gp2");
            let key = aws_key(asset, "AmazonEC2", "Storage")
                .with_attribute("volume_api_name", volume_type);
            units.push(PriceableUnit::numeric(
                "root_volume",
                "gb_month",
                Decimal::from(size),
                key,
                Confidence::new(STORAGE_CONFIDENCE),
            ));
        }

        units
    }
}
