//! Integration tests for stack composition.
//!
//! These tests drive the public API end to end:
//! 1. Declaration and wiring errors
//! 2. Ordering, naming and substitution in composed stacks
//! 3. Export collection
//! 4. Determinism across builds, blueprint and manifest

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::path::Path;

use cairn_common::config::Environment;
use cairn_common::error::{CairnError, ErrorKind};
use cairn_common::types::ResourceKind;
use cairn_compose::blueprint::{PortfolioParams, portfolio};
use cairn_compose::manifest::load_manifest;
use cairn_compose::{ExportDecl, ResourceNode, Stack, StackBuilder};
use serde_json::json;

fn env() -> Environment {
    Environment::new("dev", "123456789012", "us-east-1").expect("env")
}

fn demo_manifest() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/portfolio.yaml"))
}

fn assert_topological(stack: &Stack) {
    for (position, resource) in stack.resources.iter().enumerate() {
        for dep in &resource.depends_on {
            let dep_position = stack.position(dep.as_str()).expect("dependency in stack");
            assert!(
                dep_position < position,
                "{dep} must precede {}",
                resource.id
            );
        }
    }
}

// ── Wiring ───────────────────────────────────────────────────────────

#[test]
fn simple_chain_substitutes_pinned_subnet() {
    let mut b = StackBuilder::new("site", env());
    let _ = b
        .declare(
            ResourceNode::new("network", ResourceKind::Network)
                .with_config("cidr", "10.0.0.0/16")
                .with_output("subnetId", "subnet-A"),
        )
        .expect("network")
        .declare(ResourceNode::new("database", ResourceKind::Database).with_config("engine", "postgres"))
        .expect("database")
        .wire("database", "subnetId", "network", "subnetId")
        .expect("wire");

    let stack = b.build().expect("build");
    let order: Vec<&str> = stack.order().into_iter().map(|id| id.as_str()).collect();
    assert_eq!(order, ["network", "database"]);
    assert_eq!(
        stack.resource("database").expect("database").config["subnetId"],
        json!("subnet-A")
    );
}

#[test]
fn reference_to_undeclared_producer_fails() {
    let mut b = StackBuilder::new("site", env());
    let _ = b
        .declare(ResourceNode::new("gateway", ResourceKind::Gateway))
        .expect("gateway");
    let err = b.wire("gateway", "backend", "compute-1", "invokeArn").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Wiring);
    assert!(err.to_string().contains("compute-1"), "got: {err}");
    assert_eq!(err.location(), Some(("gateway", "backend")));
}

#[test]
fn conflicting_export_names_fail() {
    let mut b = StackBuilder::new("site", env());
    let _ = b
        .declare(ResourceNode::new("network", ResourceKind::Network).with_config("cidr", "10.0.0.0/16"))
        .expect("network")
        .export(ExportDecl::new("Endpoint", "network", "vpcId"))
        .expect("first");
    let err = b
        .export(ExportDecl::new("Endpoint", "network", "subnetId"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Export);
    assert!(matches!(err, CairnError::DuplicateExport { ref export, .. } if export == "Endpoint"));
}

#[test]
fn colliding_derived_names_fail() {
    let mut b = StackBuilder::new("site", env());
    let _ = b
        .declare(ResourceNode::new("ui-bucket", ResourceKind::ObjectStore))
        .expect("first")
        .declare(ResourceNode::new("UI_Bucket", ResourceKind::ObjectStore))
        .expect("second");
    let err = b.build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(
        matches!(err, CairnError::DuplicateName { ref node, .. } if node == "UI_Bucket"),
        "got: {err}"
    );
}

#[test]
fn missing_required_config_is_a_schema_violation() {
    let mut b = StackBuilder::new("site", env());
    let err = b
        .declare(ResourceNode::new("network", ResourceKind::Network))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(err.location(), Some(("network", "cidr")));
}

// ── Composition ──────────────────────────────────────────────────────

#[test]
fn blueprint_is_topologically_ordered_and_uniquely_named() {
    let stack = portfolio(env(), &PortfolioParams::default())
        .expect("declare")
        .build()
        .expect("build");
    assert_topological(&stack);

    let names: HashSet<&str> = stack.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), stack.resources.len());
    assert!(stack.resources.iter().all(|r| r.name.len() <= 63));
}

#[test]
fn every_reference_is_substituted_with_the_producer_output() {
    let builder = portfolio(env(), &PortfolioParams::default()).expect("declare");
    let stack = builder.build().expect("build");
    for node in builder.nodes() {
        let resolved = stack.resource(node.id.as_str()).expect("resolved");
        for (slot, reference) in node.references() {
            let expected = if reference.producer.as_str() == "environment" {
                stack.environment.output(&reference.output).expect("env output").to_string()
            } else {
                stack.resource(reference.producer.as_str()).expect("producer").outputs
                    [&reference.output]
                    .clone()
            };
            assert_eq!(resolved.config[slot], json!(expected), "{}.{slot}", node.id);
        }
    }
}

#[test]
fn exports_cover_exactly_the_declared_names() {
    let builder = portfolio(env(), &PortfolioParams::default()).expect("declare");
    let stack = builder.build().expect("build");
    let declared: Vec<&str> = builder.exports().iter().map(|e| e.name.as_str()).collect();
    let mut exported: Vec<&str> = stack.exports.keys().map(String::as_str).collect();
    let mut expected = declared.clone();
    expected.sort_unstable();
    exported.sort_unstable();
    assert_eq!(exported, expected);

    assert_eq!(stack.exports["Environment"].value, "dev");
    assert!(stack.exports["UiUrl"].value.starts_with("https://"));
    assert_eq!(stack.exports["DbPort"].value, "5432");
}

// ── Determinism ──────────────────────────────────────────────────────

#[test]
fn repeated_builds_are_identical() {
    let first = portfolio(env(), &PortfolioParams::default())
        .expect("declare")
        .build()
        .expect("build");
    let second = portfolio(env(), &PortfolioParams::default())
        .expect("declare")
        .build()
        .expect("build");
    assert_eq!(first, second);
    assert_eq!(first.digest().expect("digest"), second.digest().expect("digest"));
}

#[test]
fn names_differ_across_environments() {
    let dev = portfolio(env(), &PortfolioParams::default())
        .expect("declare")
        .build()
        .expect("build");
    let prod_env = Environment::new("prod", "123456789012", "us-east-1").expect("env");
    let prod = portfolio(prod_env, &PortfolioParams::default())
        .expect("declare")
        .build()
        .expect("build");
    for (a, b) in dev.resources.iter().zip(&prod.resources) {
        assert_eq!(a.id, b.id);
        assert_ne!(a.name, b.name);
    }
}

#[test]
fn demo_manifest_matches_the_blueprint() {
    let from_manifest = load_manifest(demo_manifest())
        .expect("load")
        .into_builder(env())
        .expect("declare")
        .build()
        .expect("build");
    let from_blueprint = portfolio(env(), &PortfolioParams::default())
        .expect("declare")
        .build()
        .expect("build");
    assert_topological(&from_manifest);
    assert_eq!(from_manifest, from_blueprint);
}
