//! `aws_db_instance` mapper.
//!
//! Two components: database instance hours by class, and allocated
//! storage by volume type. The components price independently: a
//! miss on the instance class still leaves storage numeric.

use rust_decimal::Decimal;

use terracast_core::confidence::Confidence;
use terracast_core::usage::{UsageContext, UsageVector};

use crate::aws::aws_key;
use crate::mapper::{AssetView, ResourceMapper, STORAGE_CONFIDENCE};
use crate::unit::PriceableUnit;

/// Mapper for `aws_db_instance`.
pub struct DbInstanceMapper;

impl ResourceMapper for DbInstanceMapper {
    fn name(&self) -> &'static str {
        "aws_db_instance"
    }

    fn build_usage(&self, asset: &AssetView<'_>, ctx: &UsageContext) -> Vec<UsageVector> {
        vec![asset.monthly_hours(ctx)]
    }

    fn build_cost_units(
        &self,
        asset: &AssetView<'_>,
        usage: &[UsageVector],
    ) -> Vec<PriceableUnit> {
        let mut units = Vec::new();

        let deployment = if asset.attributes.bool("multi_az").unwrap_or(false) {
            "multi-az"
        } else {
            "single-az"
        };
        let engine = asset.attributes.str("engine").unwrap_or("postgres");

        match asset.attributes.str("instance_class") {
            Some(instance_class) => {
                for vector in usage {
                    if let UsageVector::Known {
                        metric,
                        quantity,
                        confidence,
                    } = vector
                    {
                        if metric != "monthly_hours" {
                            continue;
                        }
                        let key = aws_key(asset, "AmazonRDS", "Database Instance")
                            .with_attribute("instance_class", instance_class)
                            .with_attribute("database_engine", engine)
                            .with_attribute("deployment_option", deployment);
                        units.push(PriceableUnit::numeric(
                            "database_hours",
                            "hours",
                            *quantity,
                            key,
                            *confidence,
                        ));
                    }
                }
            }
            None => units.push(PriceableUnit::symbolic(
                "database_hours",
                "instance_class is not a literal value",
            )),
        }

        match asset.attributes.int("allocated_storage") {
            Some(allocated) => {
                let storage_type = asset.attributes.str("storage_type").unwrap_or("gp2");
                let key = aws_key(asset, "AmazonRDS", "Database Storage")
                    .with_attribute("volume_type", storage_type)
                    .with_attribute("deployment_option", deployment);
                units.push(PriceableUnit::numeric(
                    "allocated_storage",
                    "gb_month",
                    Decimal::from(allocated),
                    key,
                    Confidence::new(STORAGE_CONFIDENCE),
                ));
            }
            None => units.push(PriceableUnit::symbolic(
                "allocated_storage",
                "allocated_storage is not a literal value",
            )),
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
            address: "aws_db_instance.main",
            resource_type: "aws_db_instance",
            region: "us-east-1",
            provider_alias: "default",
            attributes: AttrView::new(attrs),
        }
    }

    #[test]
    fn bills_instance_and_storage() {
        let mut attrs = BTreeMap::new();
        attrs.insert("instance_class".to_string(), json!("db.t3.medium"));
        attrs.insert("engine".to_string(), json!("mysql"));
        attrs.insert("allocated_storage".to_string(), json!(100));
        let asset = view(&attrs);
        let ctx = UsageContext::new("default");

        let mapper = DbInstanceMapper;
        let usage = mapper.build_usage(&asset, &ctx);
        let units = mapper.build_cost_units(&asset, &usage);

        assert_eq!(units.len(), 2);
        match &units[0] {
            PriceableUnit::Numeric { rate_key, .. } => {
                assert_eq!(
                    rate_key.attributes.get("instance_class").unwrap(),
                    "db.t3.medium"
                );
                assert_eq!(
                    rate_key.attributes.get("deployment_option").unwrap(),
                    "single-az"
                );
            }
            PriceableUnit::Symbolic { .. } => panic!("expected numeric unit"),
        }
        match &units[1] {
            PriceableUnit::Numeric { quantity, .. } => assert_eq!(*quantity, dec!(100)),
            PriceableUnit::Symbolic { .. } => panic!("expected numeric unit"),
        }
    }

    #[test]
    fn multi_az_changes_deployment_option() {
        let mut attrs = BTreeMap::new();
        attrs.insert("instance_class".to_string(), json!("db.t3.medium"));
        attrs.insert("multi_az".to_string(), json!(true));
        attrs.insert("allocated_storage".to_string(), json!(20));
        let asset = view(&attrs);
        let ctx = UsageContext::new("default");

        let mapper = DbInstanceMapper;
        let usage = mapper.build_usage(&asset, &ctx);
        let units = mapper.build_cost_units(&asset, &usage);
        match &units[0] {
            PriceableUnit::Numeric { rate_key, .. } => {
                assert_eq!(
                    rate_key.attributes.get("deployment_option").unwrap(),
                    "multi-az"
                );
            }
            PriceableUnit::Symbolic { .. } => panic!("expected numeric unit"),
        }
    }

    #[test]
    fn missing_storage_is_symbolic_component() {
        let mut attrs = BTreeMap::new();
        attrs.insert("instance_class".to_string(), json!("db.t3.medium"));
        let asset = view(&attrs);
        let ctx = UsageContext::new("default");

        let mapper = DbInstanceMapper;
        let usage = mapper.build_usage(&asset, &ctx);
        let units = mapper.build_cost_units(&asset, &usage);
        assert_eq!(units.len(), 2);
        assert!(units[1].is_symbolic());
    }
}
