//! Diff scenarios over two full estimations.

use rust_decimal_macros::dec;
use serde_json::json;

use terracast_core::envelope::{InputEnvelope, RawRequest};
use terracast_core::input::{Expression, ParsedConfig, ParsedProvider, ParsedResource};
use terracast_core::money::Currency;
use terracast_core::usage::UsageContext;
use terracast_diff::{compute_diff, ChangeDriver, DiffConfig, Relation};
use terracast_engine::{CancelSignal, EstimationResult, Estimator};
use terracast_pricing::{PricingSnapshot, Rate, RateKey, SnapshotBuilder};

fn envelope(path: &str) -> InputEnvelope {
    InputEnvelope::normalize(
        &RawRequest {
            source: "local".into(),
            path: path.into(),
            mode: "permissive".into(),
            ..RawRequest::default()
        },
        None,
    )
    .unwrap()
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
    builder.seal()
}

fn provider_block() -> ParsedProvider {
    ParsedProvider {
        provider_type: "aws".into(),
        region: Some("us-east-1".into()),
        ..ParsedProvider::default()
    }
}

fn estimate(path: &str, config: &ParsedConfig) -> EstimationResult {
    Estimator::with_defaults()
        .estimate(
            &envelope(path),
            config,
            &snapshot(),
            &UsageContext::new("default"),
            &CancelSignal::new(),
        )
        .unwrap()
}

fn subnet(name: &str) -> ParsedResource {
    ParsedResource {
        address: format!("aws_subnet.{name}"),
        resource_type: "aws_subnet".into(),
        ..ParsedResource::default()
    }
}

fn web_on(subnet_name: &str) -> ParsedResource {
    let mut web = ParsedResource {
        address: "aws_instance.web".into(),
        resource_type: "aws_instance".into(),
        ..ParsedResource::default()
    };
    web.attributes
        .insert("instance_type".into(), json!("t3.micro"));
    web.references.insert(
        "subnet_id".into(),
        vec![format!("aws_subnet.{subnet_name}.id")],
    );
    web
}

/// Subnet replacement upstream of an otherwise-unchanged instance.
#[test]
fn s5_upstream_replacement_yields_causal_chain() {
    let base_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("a"), web_on("a")],
        ..ParsedConfig::default()
    };
    let head_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("b"), web_on("b")],
        ..ParsedConfig::default()
    };

    let base = estimate("envs/base", &base_config);
    let head = estimate("envs/head", &head_config);
    let diff = compute_diff(&base, &head, &DiffConfig::default());

    let added: Vec<&str> = diff.added.iter().map(|a| a.address.as_str()).collect();
    let removed: Vec<&str> = diff.removed.iter().map(|a| a.address.as_str()).collect();
    assert_eq!(added, vec!["aws_subnet.b"]);
    assert_eq!(removed, vec!["aws_subnet.a"]);

    assert_eq!(diff.changed.len(), 1);
    let change = &diff.changed[0];
    assert_eq!(change.address, "aws_instance.web");
    // Rate and quantity are unchanged; only the wiring moved.
    assert_eq!(change.drivers, vec![ChangeDriver::ConfigurationOnly]);
    assert_eq!(change.delta, dec!(0));
    assert!(change
        .causal_chain
        .iter()
        .any(|link| link.address == "aws_subnet.b" && link.relation == Relation::Added));

    // No cost moved in aggregate.
    assert_eq!(diff.delta_monthly, dec!(0));
}

/// diff(E, E) is empty with zero deltas.
#[test]
fn identical_estimations_diff_empty() {
    let config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("a"), web_on("a")],
        ..ParsedConfig::default()
    };
    let base = estimate("envs/same", &config);
    let head = estimate("envs/same", &config);

    let diff = compute_diff(&base, &head, &DiffConfig::default());
    assert!(diff.is_empty());
    assert_eq!(diff.unchanged.len(), 2);
    assert_eq!(diff.delta_monthly, dec!(0));
    assert_eq!(diff.percent, "+0.0%");
    assert!(diff.authoritative_amounts);
    assert_eq!(diff.confidence_delta, 0.0);
}

/// An instance-type change is a rate change, not configuration-only.
#[test]
fn rate_change_is_classified() {
    let mut head_web = web_on("a");
    head_web
        .attributes
        .insert("instance_type".into(), json!("t3.small"));

    let base_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("a"), web_on("a")],
        ..ParsedConfig::default()
    };
    let head_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("a"), head_web],
        ..ParsedConfig::default()
    };

    let base = estimate("envs/base", &base_config);
    let head = estimate("envs/head", &head_config);
    let diff = compute_diff(&base, &head, &DiffConfig::default());

    // t3.small misses the snapshot, so head carries a symbolic unit:
    // amounts are no longer authoritative.
    assert!(!diff.authoritative_amounts);
    assert_eq!(diff.min_confidence.value(), 0.0);

    let change = diff
        .changed
        .iter()
        .find(|c| c.address == "aws_instance.web")
        .unwrap();
    assert!(change.drivers.contains(&ChangeDriver::RateChanged));
}

/// The two-envelope entry point estimates both sides itself.
#[test]
fn diff_configurations_runs_both_estimations() {
    let base_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("a"), web_on("a")],
        ..ParsedConfig::default()
    };
    let head_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![subnet("b"), web_on("b")],
        ..ParsedConfig::default()
    };

    let diff = terracast_diff::diff_configurations(
        &Estimator::with_defaults(),
        &envelope("envs/base"),
        &base_config,
        &envelope("envs/head"),
        &head_config,
        &snapshot(),
        &UsageContext::new("default"),
        &CancelSignal::new(),
        &DiffConfig::default(),
    )
    .unwrap();

    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.removed.len(), 1);
    assert_ne!(diff.base_hash, diff.head_hash);
}

/// Symbolic buckets on either side force the non-authoritative tag.
#[test]
fn symbolic_side_is_non_authoritative() {
    let base_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![web_on("a"), subnet("a")],
        ..ParsedConfig::default()
    };

    let mut workers = ParsedResource {
        address: "aws_instance.workers".into(),
        resource_type: "aws_instance".into(),
        ..ParsedResource::default()
    };
    workers
        .attributes
        .insert("instance_type".into(), json!("t3.micro"));
    workers.for_each = Some(Expression::raw("module.cfg.worker_names"));
    let head_config = ParsedConfig {
        providers: vec![provider_block()],
        resources: vec![web_on("a"), subnet("a"), workers],
        ..ParsedConfig::default()
    };

    let base = estimate("envs/base", &base_config);
    let head = estimate("envs/head", &head_config);
    let diff = compute_diff(&base, &head, &DiffConfig::default());

    assert!(!diff.authoritative_amounts);
    assert_eq!(diff.min_confidence.value(), 0.0);
    // Structure is still reported: nothing added or removed among
    // priced assets, existing assets unchanged.
    assert!(diff.added.is_empty());
    assert!(diff.removed.is_empty());
    assert_eq!(diff.unchanged.len(), 2);
}
