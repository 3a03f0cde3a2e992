//! End-to-end estimation scenarios over literal configurations.

use rust_decimal_macros::dec;
use serde_json::json;

use terracast_core::envelope::{InputEnvelope, RawRequest};
use terracast_core::input::{Expression, ParsedConfig, ParsedProvider, ParsedResource};
use terracast_core::money::Currency;
use terracast_core::usage::UsageContext;
use terracast_engine::{CancelSignal, Estimator};
use terracast_pricing::{PricingSnapshot, Rate, RateKey, SnapshotBuilder};

fn envelope(mode: &str) -> InputEnvelope {
    InputEnvelope::normalize(
        &RawRequest {
            source: "local".into(),
            path: "envs/prod".into(),
            mode: mode.into(),
            ..RawRequest::default()
        },
        None,
    )
    .unwrap()
}

fn provider_block() -> ParsedProvider {
    ParsedProvider {
        provider_type: "aws".into(),
        region: Some("us-east-1".into()),
        ..ParsedProvider::default()
    }
}

fn resource(address: &str, rtype: &str, attrs: &[(&str, serde_json::Value)]) -> ParsedResource {
    ParsedResource {
        address: address.to_string(),
        resource_type: rtype.to_string(),
        attributes: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        ..ParsedResource::default()
    }
}

fn snapshot() -> PricingSnapshot {
    let mut builder = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
    builder.add_rate(
        RateKey::new("aws", "AmazonEC2", "Compute Instance", "us-east-1", "default")
            .with_attribute("instance_type", "t3.micro")
            .with_attribute("os", "linux")
            .with_attribute("tenancy", "shared"),
        Rate::new("hours", dec!(0.0104), Currency::Usd),
    );
    builder.add_rate(
        RateKey::new("aws", "AmazonRDS", "Database Storage", "us-east-1", "default")
            .with_attribute("volume_type", "gp2")
            .with_attribute("deployment_option", "single-az"),
        Rate::new("gb_month", dec!(0.115), Currency::Usd),
    );
    builder.seal()
}

fn estimate(
    mode: &str,
    config: &ParsedConfig,
) -> Result<terracast_engine::EstimationResult, terracast_core::error::EstimateError> {
    Estimator::with_defaults().estimate(
        &envelope(mode),
        config,
        &snapshot(),
        &UsageContext::new("default"),
        &CancelSignal::new(),
    )
}

/// Known count, no usage input, strict mode.
#[test]
fn s1_known_count_strict() {
    let mut web = resource(
        "aws_instance.web",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    web.count = Some(Expression::evaluated("2", json!(2)));
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![web],
        ..ParsedConfig::default()
    };

    let result = estimate("strict", &config).unwrap();

    assert_eq!(result.cost_graph.asset_count(), 2);
    let units: Vec<_> = result.cost_graph.all_units().collect();
    assert_eq!(units.len(), 2);
    for unit in &units {
        assert_eq!(unit.monthly.amount, dec!(7.5920));
    }
    assert_eq!(result.total_monthly().amount, dec!(15.1840));
    assert!((result.confidence().value() - 0.95).abs() < 1e-9);
    assert!(result.cost_graph.buckets().is_empty());
    assert!(result.warnings.is_empty());
}

/// Unknown for_each, permissive mode.
#[test]
fn s2_unknown_for_each_permissive() {
    let mut workers = resource(
        "aws_instance.workers",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    workers.for_each = Some(Expression::raw("module.cfg.worker_names"));
    let web = resource(
        "aws_instance.web",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![workers, web],
        ..ParsedConfig::default()
    };

    let result = estimate("permissive", &config).unwrap();

    // No instance expanded for the unknown definition.
    for (_, units) in result.cost_graph.iter() {
        for unit in units {
            assert!(!unit.asset_address.starts_with("aws_instance.workers"));
        }
    }
    assert_eq!(result.cost_graph.buckets().len(), 1);
    let bucket = &result.cost_graph.buckets()[0];
    assert_eq!(bucket.address, "aws_instance.workers");
    assert!(bucket.reason.contains("for_each"));
    assert!(bucket.reason.contains("unknown"));

    assert_eq!(result.confidence().value(), 0.0);
    // The numeric total covers only the expanded definition.
    assert_eq!(result.total_monthly().amount, dec!(7.5920));
}

/// Unknown for_each, strict mode: no partial result.
#[test]
fn s3_unknown_for_each_strict() {
    let mut workers = resource(
        "aws_instance.workers",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    workers.for_each = Some(Expression::raw("module.cfg.worker_names"));
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![workers],
        ..ParsedConfig::default()
    };

    let err = estimate("strict", &config).unwrap_err();
    assert_eq!(err.code(), "unknown_cardinality");
}

/// Rate miss on one component, permissive mode: the other component
/// still prices numerically.
#[test]
fn s4_rate_miss_permissive() {
    let db = resource(
        "aws_db_instance.main",
        "aws_db_instance",
        &[
            ("instance_class", json!("db.z99.huge")),
            ("allocated_storage", json!(100)),
            ("storage_type", json!("gp2")),
        ],
    );
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![db],
        ..ParsedConfig::default()
    };

    let result = estimate("permissive", &config).unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("no rate found"));
    assert!(result.warnings[0].message.contains("db.z99.huge"));

    let units: Vec<_> = result.cost_graph.all_units().collect();
    assert_eq!(units.len(), 2);
    let compute = units.iter().find(|u| u.name == "database_hours").unwrap();
    assert!(compute.symbolic);
    assert!(compute.monthly.is_zero());
    let storage = units
        .iter()
        .find(|u| u.name == "allocated_storage")
        .unwrap();
    assert!(!storage.symbolic);
    // 100 GB x 0.115/GB-month.
    assert_eq!(storage.monthly.amount, dec!(11.500));
}

/// Cancellation before dispatch aborts with the cancelled error.
#[test]
fn cancelled_estimation_aborts() {
    let web = resource(
        "aws_instance.web",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![web],
        ..ParsedConfig::default()
    };

    let cancel = CancelSignal::new();
    cancel.cancel();
    let err = Estimator::with_defaults()
        .estimate(
            &envelope("strict"),
            &config,
            &snapshot(),
            &UsageContext::new("default"),
            &cancel,
        )
        .unwrap_err();
    assert_eq!(err.code(), "cancelled");
}

/// A dependency cycle surfaces as the cycle error kind.
#[test]
fn cycle_is_reported() {
    let mut a = resource(
        "aws_instance.a",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    a.depends_on.push("aws_instance.b".into());
    let mut b = resource(
        "aws_instance.b",
        "aws_instance",
        &[("instance_type", json!("t3.micro"))],
    );
    b.depends_on.push("aws_instance.a".into());
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![a, b],
        ..ParsedConfig::default()
    };

    let err = estimate("permissive", &config).unwrap_err();
    assert_eq!(err.code(), "cycle");
}
