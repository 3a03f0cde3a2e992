//! Built-in AWS mappers and the AWS tier catalog.

mod ebs;
mod ec2;
mod lambda;
mod nat_gateway;
mod rds;
mod s3;

pub use ebs::EbsVolumeMapper;
pub use ec2::Ec2InstanceMapper;
pub use lambda::LambdaFunctionMapper;
pub use nat_gateway::NatGatewayMapper;
pub use rds::DbInstanceMapper;
pub use s3::S3BucketMapper;

use std::sync::Arc;

use terracast_pricing::RateKey;

use crate::mapper::{AssetView, Cloud};
use crate::registry::RegistryBuilder;

/// Resource types with no direct charge. They stay in the cost graph
/// as zero-cost lineage nodes.
const INDIRECT: &[&str] = &[
    "aws_internet_gateway",
    "aws_iam_role",
    "aws_route_table",
    "aws_security_group",
    "aws_subnet",
    "aws_vpc",
];

/// Registers the AWS catalog on a builder.
#[must_use]
pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    let mut builder = builder
        .numeric(Cloud::Aws, "aws_instance", Arc::new(Ec2InstanceMapper))
        .numeric(Cloud::Aws, "aws_ebs_volume", Arc::new(EbsVolumeMapper))
        .numeric(Cloud::Aws, "aws_db_instance", Arc::new(DbInstanceMapper))
        .numeric(Cloud::Aws, "aws_nat_gateway", Arc::new(NatGatewayMapper))
        .symbolic_expected(
            Cloud::Aws,
            "aws_lambda_function",
            Arc::new(LambdaFunctionMapper),
        )
        .symbolic_expected(Cloud::Aws, "aws_s3_bucket", Arc::new(S3BucketMapper));
    for resource_type in INDIRECT {
        builder = builder.indirect(Cloud::Aws, resource_type);
    }
    builder
}

/// Rate key rooted at the asset's region and alias.
pub(crate) fn aws_key(asset: &AssetView<'_>, service: &str, product_family: &str) -> RateKey {
    RateKey::new(
        "aws",
        service,
        product_family,
        asset.region,
        asset.provider_alias,
    )
}
