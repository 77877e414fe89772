//! Manifest parsing and catalog compilation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use metricgate_core::error::BuildError;
use metricgate_core::model::{DimensionType, MetricType};
use metricgate_engine::catalog::SemanticCatalog;
use metricgate_engine::manifest::parse_manifest;

fn fixture() -> String {
    fs::read_to_string("tests/fixtures/semantic_manifest.json").unwrap()
}

fn compile(text: &str) -> Result<SemanticCatalog, BuildError> {
    SemanticCatalog::compile(parse_manifest(text)?)
}

#[test]
fn lists_metrics_in_manifest_order() {
    let catalog = compile(&fixture()).unwrap();
    let names: Vec<_> = catalog.descriptors().into_iter().map(|m| m.name).collect();
    assert_eq!(names, ["revenue", "order_count", "discounted_orders", "revenue_per_order"]);
}

#[test]
fn simple_metric_gets_local_joined_and_metric_time_dimensions() {
    let catalog = compile(&fixture()).unwrap();
    let revenue = catalog.metric("revenue").unwrap().descriptor();
    assert_eq!(revenue.metric_type, MetricType::Simple);
    assert_eq!(revenue.label.as_deref(), Some("Revenue"));

    let qualified: Vec<_> = revenue.dimensions.iter().map(|d| d.qualified_name.as_str()).collect();
    assert_eq!(
        qualified,
        ["metric_time", "order_id__ordered_at", "order_id__channel", "location__location_name"]
    );

    let metric_time = &revenue.dimensions[0];
    assert_eq!(metric_time.dimension_type, DimensionType::Time);
    assert_eq!(metric_time.time_granularity.as_deref(), Some("day"));

    let location = revenue
        .dimensions
        .iter()
        .find(|d| d.qualified_name == "location__location_name")
        .unwrap();
    assert_eq!(location.name, "location_name");
    assert_eq!(location.label.as_deref(), Some("Location"));
}

#[test]
fn derived_metric_types_are_listed_without_dimensions() {
    let catalog = compile(&fixture()).unwrap();
    let ratio = catalog.metric("revenue_per_order").unwrap().descriptor();
    assert_eq!(ratio.metric_type, MetricType::Ratio);
    assert!(ratio.dimensions.is_empty());
}

#[test]
fn missing_required_field_is_rejected() {
    let err = compile(r#"{"semantic_models": []}"#).unwrap_err();
    match err {
        BuildError::Rejected(msg) => assert!(msg.contains("metrics"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_measure_reference_is_rejected() {
    let text = r#"{
        "semantic_models": [],
        "metrics": [{"name": "ghost", "type": "simple", "type_params": {"measure": {"name": "nope"}}}]
    }"#;
    let err = compile(text).unwrap_err();
    assert!(matches!(err, BuildError::Rejected(ref m) if m.contains("unknown measure `nope`")));
}

#[test]
fn duplicate_metric_is_rejected() {
    let text = r#"{
        "semantic_models": [{
            "name": "orders",
            "node_relation": {"alias": "orders", "schema_name": "main"},
            "measures": [{"name": "n", "agg": "count"}]
        }],
        "metrics": [
            {"name": "n", "type": "simple", "type_params": {"measure": {"name": "n"}}},
            {"name": "n", "type": "simple", "type_params": {"measure": {"name": "n"}}}
        ]
    }"#;
    assert!(matches!(compile(text), Err(BuildError::Rejected(_))));
}

#[test]
fn agg_time_dimension_must_be_a_time_dimension() {
    let text = r#"{
        "semantic_models": [{
            "name": "orders",
            "node_relation": {"alias": "orders", "schema_name": "main"},
            "defaults": {"agg_time_dimension": "channel"},
            "measures": [{"name": "n", "agg": "count"}],
            "dimensions": [{"name": "channel", "type": "categorical"}]
        }],
        "metrics": [{"name": "n", "type": "simple", "type_params": {"measure": {"name": "n"}}}]
    }"#;
    assert!(matches!(compile(text), Err(BuildError::Rejected(_))));
}
