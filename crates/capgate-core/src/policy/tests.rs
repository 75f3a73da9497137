// crates/capgate-core/src/policy/tests.rs
// ============================================================================
// Module: Policy Unit Tests
// Description: Unit tests for availability, scope, deny, and reference policies.
// Purpose: Validate each policy in isolation, including fail-open windows.
// Dependencies: capgate-core, regex, serde_json
// ============================================================================

//! ## Overview
//! Each policy is a pure function; these tests pin its decision table.

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

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::json;

use super::ActionFilter;
use super::AvailabilityDecision;
use super::AvailabilityDenial;
use super::AvailabilityRequirement;
use super::AvailabilityTable;
use super::CrossReferenceMode;
use super::DenyRules;
use super::ScopeRequirement;
use super::ScopeTable;
use super::TierParameter;
use super::TierParameterTable;
use super::UnknownOperationDefault;
use super::builtin_availability;
use super::builtin_scopes;
use super::evaluate_availability;
use super::filter_actions;
use super::referenced_names;
use super::resolve_cross_references;
use super::strip_tier_parameters;
use crate::core::ObjectSchema;
use crate::core::OperationName;
use crate::core::ParamField;
use crate::core::ParamSchema;
use crate::core::SchemaBranch;
use crate::core::ScopeToken;
use crate::core::TargetInfo;
use crate::core::TargetState;
use crate::core::TargetVersion;
use crate::core::Tier;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn connected(version: &str, tier: Tier) -> TargetState {
    TargetState::Connected(TargetInfo::from_raw(version, tier))
}

fn scopes(labels: &[&str]) -> BTreeSet<ScopeToken> {
    labels.iter().copied().map(ScopeToken::from).collect()
}

fn gated_table() -> AvailabilityTable {
    let mut table = AvailabilityTable::new();
    table.insert("browse_y", AvailabilityRequirement::new(TargetVersion::new(13, 1), Tier::Mid));
    table
}

fn crud_schema() -> ParamSchema {
    ParamSchema::actions(vec![
        SchemaBranch::new("create", ObjectSchema::new(vec![ParamField::required(
            "title",
            json!({ "type": "string" }),
        )])),
        SchemaBranch::new("update", ObjectSchema::default()),
        SchemaBranch::new("delete", ObjectSchema::default()),
    ])
}

// ============================================================================
// SECTION: Availability
// ============================================================================

#[test]
fn availability_rejects_old_version_despite_top_tier() {
    let decision = evaluate_availability(
        &gated_table(),
        "browse_y",
        &connected("12.9", Tier::Top),
        UnknownOperationDefault::Allow,
    );
    assert_eq!(
        decision,
        AvailabilityDecision::Denied(AvailabilityDenial::VersionTooOld {
            required: TargetVersion::new(13, 1),
            connected: TargetVersion::new(12, 9),
        })
    );
}

#[test]
fn availability_rejects_low_tier() {
    let decision = evaluate_availability(
        &gated_table(),
        "browse_y",
        &connected("16.0", Tier::Base),
        UnknownOperationDefault::Allow,
    );
    assert!(matches!(decision, AvailabilityDecision::Denied(AvailabilityDenial::TierTooLow { .. })));
}

#[test]
fn availability_unparsable_version_fails_closed() {
    let decision = evaluate_availability(
        &gated_table(),
        "browse_y",
        &connected("unknown", Tier::Top),
        UnknownOperationDefault::Allow,
    );
    assert!(!decision.is_allowed());
}

#[test]
fn availability_pending_is_fail_open_and_unknown_is_closed() {
    let table = gated_table();
    let pending =
        evaluate_availability(&table, "browse_y", &TargetState::Pending, UnknownOperationDefault::Deny);
    assert_eq!(pending, AvailabilityDecision::AllowedPending);
    let unknown = evaluate_availability(
        &table,
        "browse_y",
        &TargetState::Unknown,
        UnknownOperationDefault::Allow,
    );
    assert_eq!(unknown, AvailabilityDecision::Denied(AvailabilityDenial::NotConnected));
}

#[test]
fn availability_unknown_operation_follows_configured_default() {
    let table = AvailabilityTable::new();
    let floor = UnknownOperationDefault::AllowIfRecent(TargetVersion::new(15, 0));
    assert!(evaluate_availability(&table, "new_op", &connected("15.2", Tier::Base), floor).is_allowed());
    assert!(!evaluate_availability(&table, "new_op", &connected("14.9", Tier::Top), floor).is_allowed());
    assert!(
        evaluate_availability(&table, "new_op", &connected("1.0", Tier::Base), UnknownOperationDefault::Allow)
            .is_allowed()
    );
    assert!(
        !evaluate_availability(&table, "new_op", &connected("99.0", Tier::Top), UnknownOperationDefault::Deny)
            .is_allowed()
    );
}

#[test]
fn builtin_availability_gates_epics_on_mid_tier() {
    let table = builtin_availability();
    let epics = table.get("browse_epics").unwrap();
    assert_eq!(epics.min_tier, Tier::Mid);
    assert!(epics.note.is_some());
}

// ============================================================================
// SECTION: Scope
// ============================================================================

#[test]
fn scope_requires_any_listed_scope() {
    let mut table = ScopeTable::new();
    table.insert("manage_x", ScopeRequirement::any_of(["api", "write_repository"]));
    assert!(!table.allows("manage_x", &scopes(&["read_user"])));
    assert!(table.allows("manage_x", &scopes(&["write_repository"])));
}

#[test]
fn scope_absent_entry_differs_from_empty_entry() {
    let mut table = ScopeTable::new();
    table.insert("open_op", ScopeRequirement::default());
    assert!(table.allows("open_op", &BTreeSet::new()));
    assert!(table.allows("unlisted_op", &BTreeSet::new()));
    assert!(table.get("unlisted_op").is_none());
    assert!(table.get("open_op").unwrap().scopes().is_empty());
}

#[test]
fn builtin_scopes_accept_read_api_for_browse() {
    let table = builtin_scopes();
    assert!(table.allows("browse_issues", &scopes(&["read_api"])));
    assert!(!table.allows("manage_issue", &scopes(&["read_api"])));
}

// ============================================================================
// SECTION: Deny Rules
// ============================================================================

#[test]
fn deny_pattern_matches_operation_names() {
    let rules = DenyRules::new().with_pattern(Regex::new("^manage_").unwrap());
    assert!(rules.denies_operation("manage_issue"));
    assert!(!rules.denies_operation("browse_issues"));
    assert!(!DenyRules::new().denies_operation("manage_issue"));
}

#[test]
fn filter_actions_narrows_to_survivors() {
    let name = OperationName::new("manage_z");
    let rules = DenyRules::new().deny_action("manage_z", "delete");
    let ActionFilter::Narrowed {
        schema,
        removed,
    } = filter_actions(&rules, &name, &crud_schema())
    else {
        panic!("expected narrowed schema");
    };
    assert_eq!(removed.len(), 1);
    assert!(schema.has_action("create"));
    assert!(schema.has_action("update"));
    assert!(!schema.has_action("delete"));
}

#[test]
fn filter_actions_reports_all_denied() {
    let name = OperationName::new("manage_z");
    let rules = DenyRules::new()
        .deny_action("manage_z", "create")
        .deny_action("manage_z", "update")
        .deny_action("manage_z", "delete");
    assert_eq!(filter_actions(&rules, &name, &crud_schema()), ActionFilter::AllDenied);
}

#[test]
fn filter_actions_ignores_other_operations_and_flat_schemas() {
    let rules = DenyRules::new().deny_action("other", "delete");
    let name = OperationName::new("manage_z");
    assert_eq!(filter_actions(&rules, &name, &crud_schema()), ActionFilter::Unchanged);
    let flat = ParamSchema::Flat(ObjectSchema::default());
    let rules = DenyRules::new().deny_action("manage_z", "delete");
    assert_eq!(filter_actions(&rules, &name, &flat), ActionFilter::Unchanged);
}

// ============================================================================
// SECTION: Tier Parameters
// ============================================================================

#[test]
fn tier_parameters_strip_only_when_tier_is_insufficient() {
    let schema = ParamSchema::Flat(ObjectSchema::new(vec![
        ParamField::required("title", json!({ "type": "string" })),
        ParamField::optional("weight", json!({ "type": "integer" })),
    ]));
    let mut table = TierParameterTable::new();
    table.insert("manage_issue", TierParameter::new("weight", Tier::Mid));

    let (kept, stripped) =
        strip_tier_parameters(&table, "manage_issue", schema.clone(), &connected("16.0", Tier::Mid));
    assert!(stripped.is_empty());
    assert!(kept.has_parameter("weight"));

    let (narrowed, stripped) =
        strip_tier_parameters(&table, "manage_issue", schema.clone(), &connected("16.0", Tier::Base));
    assert_eq!(stripped, vec!["weight".to_string()]);
    assert!(!narrowed.has_parameter("weight"));
    assert!(narrowed.has_parameter("title"));

    let (pending, stripped) =
        strip_tier_parameters(&table, "manage_issue", schema.clone(), &TargetState::Pending);
    assert!(stripped.is_empty());
    assert_eq!(pending, schema);

    let (_, stripped) = strip_tier_parameters(&table, "manage_issue", schema, &TargetState::Unknown);
    assert_eq!(stripped.len(), 1);
}

// ============================================================================
// SECTION: Cross References
// ============================================================================

#[test]
fn cross_references_rewrite_against_survivors() {
    let description = "List issues.\nRelated: manage_issue, browse_epics";
    let rewritten = resolve_cross_references(description, CrossReferenceMode::Rewrite, |name| {
        name == "manage_issue"
    });
    assert_eq!(rewritten, "List issues.\nRelated: manage_issue");
}

#[test]
fn cross_references_drop_empty_marker_lines() {
    let description = "List issues.\n\nRelated: browse_epics";
    let rewritten = resolve_cross_references(description, CrossReferenceMode::Rewrite, |_| false);
    assert_eq!(rewritten, "List issues.");
}

#[test]
fn cross_references_strip_mode_removes_markers() {
    let description = "List issues.\nRelated: manage_issue\nMore text.";
    let stripped = resolve_cross_references(description, CrossReferenceMode::Strip, |_| true);
    assert_eq!(stripped, "List issues.\nMore text.");
    assert_eq!(referenced_names(description), vec!["manage_issue"]);
}

#[test]
fn cross_references_leave_unmarked_descriptions_verbatim() {
    let description = "List issues.\r\nSupports paging.\n\n";
    for mode in [CrossReferenceMode::Rewrite, CrossReferenceMode::Strip] {
        let resolved = resolve_cross_references(description, mode, |_| false);
        assert_eq!(resolved, description);
    }
}
