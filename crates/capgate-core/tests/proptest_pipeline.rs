// crates/capgate-core/tests/proptest_pipeline.rs
// ============================================================================
// Module: Pipeline Property-Based Tests
// Description: Property tests for catalog membership and statistics accounting.
// Purpose: Check the pipeline against an independent ground-truth evaluator.
// ============================================================================

//! Property-based tests for pipeline invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use capgate_core::AvailabilityRequirement;
use capgate_core::CapabilityTables;
use capgate_core::DenyRules;
use capgate_core::ExclusionReason;
use capgate_core::Operation;
use capgate_core::PolicySnapshot;
use capgate_core::ScopeRequirement;
use capgate_core::ScopeToken;
use capgate_core::TargetState;
use capgate_core::TargetVersion;
use capgate_core::Tier;
use capgate_core::UnknownOperationDefault;
use capgate_core::run_pipeline;
use common::action_operation;
use common::connected;
use common::flat_operation;
use proptest::prelude::*;
use regex::Regex;

const SCOPES: [&str; 4] = ["api", "read_api", "read_user", "write_repository"];
const ACTIONS: [&str; 3] = ["create", "update", "delete"];

/// Generated description of one operation and its table entries.
#[derive(Debug, Clone)]
struct OpSpec {
    multi: bool,
    mutating: bool,
    scopes: Option<Vec<usize>>,
    availability: Option<(u32, u32, u8)>,
    denied_actions: Vec<usize>,
}

/// Generated policy inputs.
#[derive(Debug, Clone)]
struct PolicySpec {
    read_only: bool,
    deny_suffix: Option<u8>,
    scopes: Option<Vec<usize>>,
    target: Option<(u32, u32, u8)>,
    unknown: u8,
}

fn tier(index: u8) -> Tier {
    match index % 3 {
        0 => Tier::Base,
        1 => Tier::Mid,
        _ => Tier::Top,
    }
}

fn op_strategy() -> impl Strategy<Value = OpSpec> {
    (
        any::<bool>(),
        any::<bool>(),
        prop::option::of(prop::collection::vec(0 .. SCOPES.len(), 0 .. 3)),
        prop::option::of((10u32 .. 18, 0u32 .. 12, 0u8 .. 3)),
        prop::collection::vec(0 .. ACTIONS.len(), 0 .. 4),
    )
        .prop_map(|(multi, mutating, scopes, availability, denied_actions)| OpSpec {
            multi,
            mutating,
            scopes,
            availability,
            denied_actions,
        })
}

fn policy_strategy() -> impl Strategy<Value = PolicySpec> {
    (
        any::<bool>(),
        prop::option::of(0u8 .. 10),
        prop::option::of(prop::collection::vec(0 .. SCOPES.len(), 0 .. 3)),
        prop::option::of((10u32 .. 18, 0u32 .. 12, 0u8 .. 3)),
        0u8 .. 3,
    )
        .prop_map(|(read_only, deny_suffix, scopes, target, unknown)| PolicySpec {
            read_only,
            deny_suffix,
            scopes,
            target,
            unknown,
        })
}

fn build(specs: &[OpSpec], policy: &PolicySpec) -> (Vec<Operation>, CapabilityTables, PolicySnapshot) {
    let mut tables = CapabilityTables::empty();
    let mut deny = DenyRules::new();
    let mut operations = Vec::new();
    for (index, spec) in specs.iter().enumerate() {
        let name = format!("op_{index}");
        let mut operation = if spec.multi {
            action_operation(&name, &ACTIONS)
        } else {
            flat_operation(&name, "Flat.")
        };
        operation.mutates_remote_state = spec.mutating;
        if let Some(scopes) = &spec.scopes {
            tables
                .scopes
                .insert(name.as_str(), ScopeRequirement::any_of(scopes.iter().map(|i| SCOPES[*i])));
        }
        if let Some((major, minor, tier_index)) = spec.availability {
            tables.availability.insert(
                name.as_str(),
                AvailabilityRequirement::new(TargetVersion::new(major, minor), tier(tier_index)),
            );
        }
        for action in &spec.denied_actions {
            deny = deny.deny_action(name.as_str(), ACTIONS[*action]);
        }
        operations.push(operation);
    }
    if let Some(suffix) = policy.deny_suffix {
        deny = deny.with_pattern(Regex::new(&format!("^op_{suffix}$")).unwrap());
    }
    let snapshot = PolicySnapshot {
        read_only: policy.read_only,
        deny,
        scopes: policy
            .scopes
            .as_ref()
            .map(|scopes| scopes.iter().map(|i| ScopeToken::new(SCOPES[*i])).collect()),
        target: policy.target.map_or(TargetState::Unknown, |(major, minor, tier_index)| {
            connected(&format!("{major}.{minor}"), tier(tier_index))
        }),
        unknown_operations: match policy.unknown {
            0 => UnknownOperationDefault::Allow,
            1 => UnknownOperationDefault::Deny,
            _ => UnknownOperationDefault::AllowIfRecent(TargetVersion::new(15, 0)),
        },
        ..PolicySnapshot::default()
    };
    (operations, tables, snapshot)
}

/// Independent re-statement of the admission rules.
fn ground_truth(index: usize, spec: &OpSpec, policy: &PolicySpec) -> Option<ExclusionReason> {
    if policy.read_only && spec.mutating {
        return Some(ExclusionReason::ReadOnly);
    }
    if policy.deny_suffix.is_some_and(|suffix| usize::from(suffix) == index) {
        return Some(ExclusionReason::DeniedRegex);
    }
    if let (Some(held), Some(required)) = (&policy.scopes, &spec.scopes) {
        let held: BTreeSet<usize> = held.iter().copied().collect();
        if !required.is_empty() && !required.iter().any(|scope| held.contains(scope)) {
            return Some(ExclusionReason::InsufficientScope);
        }
    }
    let Some((major, minor, tier_index)) = policy.target else {
        return Some(ExclusionReason::TierOrVersion);
    };
    let connected = major * 100 + minor;
    match spec.availability {
        Some((req_major, req_minor, req_tier)) => {
            if connected < req_major * 100 + req_minor || tier(tier_index) < tier(req_tier) {
                return Some(ExclusionReason::TierOrVersion);
            }
        }
        None => {
            let denied = match policy.unknown {
                0 => false,
                1 => true,
                _ => connected < 1500,
            };
            if denied {
                return Some(ExclusionReason::TierOrVersion);
            }
        }
    }
    let distinct: BTreeSet<usize> = spec.denied_actions.iter().copied().collect();
    if spec.multi && distinct.len() == ACTIONS.len() {
        return Some(ExclusionReason::AllActionsDenied);
    }
    None
}

proptest! {
    #[test]
    fn pipeline_matches_ground_truth(
        specs in prop::collection::vec(op_strategy(), 1 .. 12),
        policy in policy_strategy(),
    ) {
        let (operations, tables, snapshot) = build(&specs, &policy);
        let output = run_pipeline(&operations, &tables, &snapshot);
        let listed: BTreeSet<String> =
            output.operations.iter().map(|op| op.name.to_string()).collect();
        for (index, spec) in specs.iter().enumerate() {
            let name = format!("op_{index}");
            let expected = ground_truth(index, spec, &policy);
            prop_assert_eq!(listed.contains(&name), expected.is_none(), "operation {}", name);
            let recorded = output
                .exclusions
                .iter()
                .find(|exclusion| exclusion.operation.as_str() == name)
                .map(|exclusion| exclusion.reason);
            prop_assert_eq!(recorded, expected);
        }
    }

    #[test]
    fn statistics_account_for_every_exclusion(
        specs in prop::collection::vec(op_strategy(), 0 .. 12),
        policy in policy_strategy(),
    ) {
        let (operations, tables, snapshot) = build(&specs, &policy);
        let output = run_pipeline(&operations, &tables, &snapshot);
        let stats = output.statistics;
        prop_assert!(stats.is_consistent());
        prop_assert_eq!(stats.total, operations.len());
        prop_assert_eq!(stats.available, output.operations.len());
        prop_assert_eq!(stats.total - stats.available, stats.excluded_total());
    }

    #[test]
    fn flat_operations_ignore_action_denial(actions in prop::collection::vec(0 .. ACTIONS.len(), 0 .. 6)) {
        let operations = vec![flat_operation("flat_op", "Flat.")];
        let mut deny = DenyRules::new();
        for action in &actions {
            deny = deny.deny_action("flat_op", ACTIONS[*action]);
        }
        let snapshot = PolicySnapshot {
            deny,
            ..PolicySnapshot::permissive()
        };
        let output = run_pipeline(&operations, &CapabilityTables::empty(), &snapshot);
        prop_assert_eq!(output.operations.len(), 1);
        prop_assert_eq!(&output.operations[0].schema, &operations[0].schema);
    }

    #[test]
    fn rerunning_pipeline_is_idempotent(
        specs in prop::collection::vec(op_strategy(), 0 .. 8),
        policy in policy_strategy(),
    ) {
        let (operations, tables, snapshot) = build(&specs, &policy);
        let first = run_pipeline(&operations, &tables, &snapshot);
        let second = run_pipeline(&operations, &tables, &snapshot);
        let first_list: Vec<_> = first.operations.iter().map(|op| op.descriptor()).collect();
        let second_list: Vec<_> = second.operations.iter().map(|op| op.descriptor()).collect();
        prop_assert_eq!(first_list, second_list);
    }
}

#[test]
fn unknown_target_excludes_gated_operations() {
    let specs = vec![OpSpec {
        multi: false,
        mutating: false,
        scopes: None,
        availability: Some((10, 0, 0)),
        denied_actions: Vec::new(),
    }];
    let policy = PolicySpec {
        read_only: false,
        deny_suffix: None,
        scopes: None,
        target: None,
        unknown: 0,
    };
    let (operations, tables, snapshot) = build(&specs, &policy);
    let output = run_pipeline(&operations, &tables, &snapshot);
    assert!(output.operations.is_empty());
    assert_eq!(output.exclusions[0].detail, "target not yet connected");
}
