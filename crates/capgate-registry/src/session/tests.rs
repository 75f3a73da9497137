// crates/capgate-registry/src/session/tests.rs
// ============================================================================
// Module: Session Context Unit Tests
// Description: Unit tests for preset switching and namespace pinning.
// Purpose: Validate rebuild-and-notify on change and no-op on reselection.
// Dependencies: capgate-config, capgate-core, serde_json
// ============================================================================

//! ## Overview
//! Drives [`super::SessionContext`] against a small registry.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use capgate_config::CapgateConfig;
use capgate_core::CapabilityProvider;
use capgate_core::CapabilityTables;
use capgate_core::HandlerError;
use capgate_core::ObjectSchema;
use capgate_core::Operation;
use capgate_core::OperationHandler;
use capgate_core::ParamField;
use capgate_core::ParamSchema;
use capgate_core::StaticProvider;
use serde_json::Value;
use serde_json::json;

use super::SessionContext;
use crate::registry::CapabilityRegistry;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const CONFIG: &str = r#"
[policy]
description_overrides = { list_issues = "Base description." }

[[presets]]
name = "readonly"
read_only = true

[[presets]]
name = "no-merge"
denied_operations_regex = "merge"
"#;

struct EchoHandler;

#[async_trait]
impl OperationHandler for EchoHandler {
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError> {
        Ok(args)
    }
}

fn operation(name: &str, mutating: bool) -> Operation {
    let operation = Operation::new(
        name,
        format!("{name}."),
        ParamSchema::Flat(ObjectSchema::new(vec![ParamField::required(
            "project_id",
            json!({ "type": "string" }),
        )])),
        Arc::new(EchoHandler),
    );
    if mutating { operation.mutating() } else { operation }
}

fn setup() -> (SessionContext, CapabilityRegistry) {
    let session = SessionContext::new(CapgateConfig::parse(CONFIG).unwrap());
    let provider: Arc<dyn CapabilityProvider> = Arc::new(StaticProvider::new(
        "core",
        vec![
            operation("list_issues", false),
            operation("manage_issue", true),
            operation("merge_request", true),
        ],
    ));
    let registry = CapabilityRegistry::initialize(
        &[provider],
        CapabilityTables::empty(),
        session.initial_inputs().unwrap(),
    )
    .unwrap();
    (session, registry)
}

fn names(registry: &CapabilityRegistry) -> Vec<String> {
    registry.list().into_iter().map(|descriptor| descriptor.name.to_string()).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn switching_preset_rebuilds_and_notifies() {
    let (session, registry) = setup();
    assert_eq!(names(&registry).len(), 3);
    let mut changes = registry.subscribe();

    assert!(session.switch_preset(&registry, Some("readonly")).unwrap());
    assert_eq!(names(&registry), vec!["list_issues"]);
    assert!(changes.try_recv().is_ok());

    assert!(session.switch_preset(&registry, Some("no-merge")).unwrap());
    assert_eq!(names(&registry), vec!["list_issues", "manage_issue"]);
    assert_eq!(session.state().preset.as_deref(), Some("no-merge"));
}

#[test]
fn reselecting_active_preset_is_a_no_op() {
    let (session, registry) = setup();
    session.switch_preset(&registry, Some("readonly")).unwrap();
    let generation = registry.generation();
    let mut changes = registry.subscribe();
    assert!(!session.switch_preset(&registry, Some("readonly")).unwrap());
    assert_eq!(registry.generation(), generation);
    assert!(changes.try_recv().is_err());
}

#[test]
fn unknown_preset_leaves_catalog_untouched() {
    let (session, registry) = setup();
    let before = names(&registry);
    let generation = registry.generation();
    assert!(session.switch_preset(&registry, Some("missing")).is_err());
    assert_eq!(names(&registry), before);
    assert_eq!(registry.generation(), generation);
    assert_eq!(session.state().preset, None);
}

#[test]
fn preset_switch_keeps_base_overrides() {
    let (session, registry) = setup();
    session.switch_preset(&registry, Some("no-merge")).unwrap();
    let issue = registry.get("list_issues").unwrap();
    assert_eq!(issue.description, "Base description.");
    assert!(issue.description_overridden);
}

#[test]
fn namespace_scope_pins_parameter_and_can_be_cleared() {
    let (session, registry) = setup();
    assert!(session.set_namespace_scope(&registry, Some(" group/app ")).unwrap());
    assert_eq!(session.state().namespace_scope.as_deref(), Some("group/app"));
    let pinned = registry.get("list_issues").unwrap();
    assert!(!pinned.schema.has_parameter("project_id"));
    assert_eq!(pinned.pinned.as_ref().unwrap().value, "group/app");

    assert!(session.set_namespace_scope(&registry, None).unwrap());
    assert!(registry.get("list_issues").unwrap().schema.has_parameter("project_id"));
}

#[test]
fn malformed_namespace_scope_is_rejected() {
    let (session, registry) = setup();
    assert!(session.set_namespace_scope(&registry, Some("group//app")).is_err());
    assert!(session.set_namespace_scope(&registry, Some("   ")).is_err());
    assert_eq!(session.state().namespace_scope, None);
}
