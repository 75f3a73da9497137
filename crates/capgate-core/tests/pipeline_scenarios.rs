// crates/capgate-core/tests/pipeline_scenarios.rs
// ============================================================================
// Module: Pipeline Scenario Tests
// Description: End-to-end filter scenarios over the public pipeline API.
// Purpose: Pin scope, availability, action-denial, and override behavior.
// ============================================================================

//! Scenario tests for the capability filter pipeline.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use capgate_core::AvailabilityRequirement;
use capgate_core::CapabilityTables;
use capgate_core::DenyRules;
use capgate_core::ExclusionReason;
use capgate_core::PolicySnapshot;
use capgate_core::ScopeRequirement;
use capgate_core::ScopeToken;
use capgate_core::TargetVersion;
use capgate_core::Tier;
use capgate_core::run_pipeline;
use common::action_operation;
use common::connected;
use common::flat_operation;

fn scope_set(labels: &[&str]) -> Option<BTreeSet<ScopeToken>> {
    Some(labels.iter().copied().map(ScopeToken::from).collect())
}

#[test]
fn insufficient_scope_excludes_and_matching_scope_includes() {
    let mut tables = CapabilityTables::empty();
    tables.scopes.insert("manage_x", ScopeRequirement::any_of(["api", "write_repository"]));
    let operations = vec![action_operation("manage_x", &["create"])];

    let denied = PolicySnapshot {
        scopes: scope_set(&["read_user"]),
        ..PolicySnapshot::permissive()
    };
    let output = run_pipeline(&operations, &tables, &denied);
    assert!(output.operations.is_empty());
    assert_eq!(output.exclusions[0].reason, ExclusionReason::InsufficientScope);

    let allowed = PolicySnapshot {
        scopes: scope_set(&["write_repository"]),
        ..PolicySnapshot::permissive()
    };
    let output = run_pipeline(&operations, &tables, &allowed);
    assert_eq!(output.operations.len(), 1);
}

#[test]
fn old_version_excludes_despite_sufficient_tier() {
    let mut tables = CapabilityTables::empty();
    tables
        .availability
        .insert("browse_y", AvailabilityRequirement::new(TargetVersion::new(13, 1), Tier::Mid));
    let operations = vec![flat_operation("browse_y", "Browse Y.")];
    let policy = PolicySnapshot {
        target: connected("12.9", Tier::Top),
        ..PolicySnapshot::default()
    };
    let output = run_pipeline(&operations, &tables, &policy);
    assert!(output.operations.is_empty());
    assert_eq!(output.exclusions[0].reason, ExclusionReason::TierOrVersion);
    assert_eq!(output.statistics.tier_or_version, 1);
}

#[test]
fn denying_every_action_excludes_and_partial_denial_narrows() {
    let operations = vec![action_operation("manage_z", &["create", "update", "delete"])];
    let tables = CapabilityTables::empty();

    let all = PolicySnapshot {
        deny: DenyRules::new()
            .deny_action("manage_z", "create")
            .deny_action("manage_z", "update")
            .deny_action("manage_z", "delete"),
        ..PolicySnapshot::permissive()
    };
    let output = run_pipeline(&operations, &tables, &all);
    assert!(output.operations.is_empty());
    assert_eq!(output.exclusions[0].reason, ExclusionReason::AllActionsDenied);

    let partial = PolicySnapshot {
        deny: DenyRules::new().deny_action("manage_z", "delete"),
        ..PolicySnapshot::permissive()
    };
    let output = run_pipeline(&operations, &tables, &partial);
    let derived = &output.operations[0];
    let actions: Vec<&str> =
        derived.schema.action_names().into_iter().map(|action| action.as_str()).collect();
    assert_eq!(actions, vec!["create", "update"]);
    assert!(derived.is_action_removed("delete"));
    let rendered = derived.descriptor().input_schema;
    assert_eq!(rendered["oneOf"].as_array().unwrap().len(), 2);
}

#[test]
fn override_is_verbatim_and_skips_cross_references() {
    let operations = vec![
        flat_operation("core_tool_1", "Original text.\nRelated: hidden_tool"),
        flat_operation("core_tool_2", "Second.\nRelated: hidden_tool, core_tool_1"),
    ];
    let mut policy = PolicySnapshot::permissive();
    let override_text = "Operator supplied.\nRelated: hidden_tool";
    policy.description_overrides.insert("core_tool_1".into(), override_text.to_string());
    let output = run_pipeline(&operations, &CapabilityTables::empty(), &policy);
    assert_eq!(output.operations[0].description, override_text);
    assert_eq!(output.operations[1].description, "Second.\nRelated: core_tool_1");
}

#[test]
fn builtin_tables_cover_stock_catalog() {
    let tables = CapabilityTables::builtin();
    assert!(tables.availability.get("browse_vulnerabilities").is_some());
    assert!(tables.scopes.get("browse_users").is_some());
    assert!(!tables.tier_parameters.get("manage_issue").is_empty());
}
