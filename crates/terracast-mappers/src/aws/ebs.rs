//! `aws_ebs_volume` mapper.

use rust_decimal::Decimal;

use terracast_core::confidence::Confidence;
use terracast_core::usage::{UsageContext, UsageVector};

use crate::aws::aws_key;
use crate::mapper::{AssetView, ResourceMapper, STORAGE_CONFIDENCE};
use crate::unit::PriceableUnit;

/// Volume types that bill provisioned IOPS separately.
const PROVISIONED_IOPS_TYPES: &[&str] = &["io1", "io2"];

/// Mapper for `aws_ebs_volume`.
pub struct EbsVolumeMapper;

impl ResourceMapper for EbsVolumeMapper {
    fn name(&self) -> &'static str {
        "aws_ebs_volume"
    }

    fn build_usage(&self, _asset: &AssetView<'_>, _ctx: &UsageContext) -> Vec<UsageVector> {
        // Storage bills on provisioned size; no usage input involved.
        Vec::new()
    }

    fn build_cost_units(
        &self,
        asset: &AssetView<'_>,
        _usage: &[UsageVector],
    ) -> Vec<PriceableUnit> {
        let volume_type = asset.attributes.str("type").unwrap_or("gp2");

        // A volume restored from a snapshot may omit `size`; the real
        // size is the snapshot's and unknowable here.
        let Some(size) = asset.attributes.int("size") else {
            return vec![PriceableUnit::symbolic(
                "storage",
                "size is not set (inherited from snapshot)",
            )];
        };

        let confidence = Confidence::new(STORAGE_CONFIDENCE);
        let mut units = vec![PriceableUnit::numeric(
            "storage",
            "gb_month",
            Decimal::from(size),
            aws_key(asset, "AmazonEC2", "Storage").with_attribute("volume_api_name", volume_type),
            confidence,
        )];

        if PROVISIONED_IOPS_TYPES.contains(&volume_type) {
            if let Some(iops) = asset.attributes.int("iops") {
                units.push(PriceableUnit::numeric(
                    "provisioned_iops",
                    "iops_month",
                    Decimal::from(iops),
                    aws_key(asset, "AmazonEC2", "System Operation")
                        .with_attribute("volume_api_name", volume_type)
                        .with_attribute("group", "ebs_iops"),
                    confidence,
                ));
            }
        }

        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::BTreeMap;
    use terracast_core::input::AttrView;

    fn view(attrs: &BTreeMap<String, serde_json::Value>) -> AssetView<'_> {
        AssetView {
            address: "aws_ebs_volume.data",
            resource_type: "aws_ebs_volume",
            region: "us-east-1",
            provider_alias: "default",
            attributes: AttrView::new(attrs),
        }
    }

    #[test]
    fn bills_gb_months_by_type() {
        let mut attrs = BTreeMap::new();
        attrs.insert("size".to_string(), json!(100));
        attrs.insert("type".to_string(), json!("gp3"));
        let asset = view(&attrs);

        let mapper = EbsVolumeMapper;
        let units = mapper.build_cost_units(&asset, &[]);
        assert_eq!(units.len(), 1);
        match &units[0] {
            PriceableUnit::Numeric {
                quantity, rate_key, ..
            } => {
                assert_eq!(*quantity, dec!(100));
                assert_eq!(rate_key.attributes.get("volume_api_name").unwrap(), "gp3");
            }
            PriceableUnit::Symbolic { .. } => panic!("expected numeric unit"),
        }
    }

    #[test]
    fn io2_bills_provisioned_iops() {
        let mut attrs = BTreeMap::new();
        attrs.insert("size".to_string(), json!(500));
        attrs.insert("type".to_string(), json!("io2"));
        attrs.insert("iops".to_string(), json!(4000));
        let asset = view(&attrs);

        let units = EbsVolumeMapper.build_cost_units(&asset, &[]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].name(), "provisioned_iops");
    }

    #[test]
    fn snapshot_sized_volume_is_symbolic() {
        let attrs = BTreeMap::new();
        let asset = view(&attrs);
        let units = EbsVolumeMapper.build_cost_units(&asset, &[]);
        assert!(units[0].is_symbolic());
    }
}
