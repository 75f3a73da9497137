// crates/capgate-core/src/policy/builtin.rs
// ============================================================================
// Module: Built-in Capability Tables
// Description: Availability, scope, and tier-parameter entries for the stock catalog.
// Purpose: Ship requirement tables for the GitLab-flavoured operation catalog.
// Dependencies: crate::{core, policy}
// ============================================================================

//! ## Overview
//! Requirement data for the operations shipped with the stock providers.
//! Deployments with their own providers build tables explicitly instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::TargetVersion;
use crate::core::Tier;
use crate::policy::availability::AvailabilityRequirement;
use crate::policy::availability::AvailabilityTable;
use crate::policy::scope::ScopeRequirement;
use crate::policy::scope::ScopeTable;
use crate::policy::tier_params::TierParameter;
use crate::policy::tier_params::TierParameterTable;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scopes granting read access to the API.
const READ_SCOPES: &[&str] = &["api", "read_api"];
/// Scopes granting write access to the API.
const WRITE_SCOPES: &[&str] = &["api"];
/// Scopes granting repository read access.
const REPOSITORY_READ_SCOPES: &[&str] = &["api", "read_api", "read_repository"];
/// Scopes granting repository write access.
const REPOSITORY_WRITE_SCOPES: &[&str] = &["api", "write_repository"];
/// Scopes granting user profile access.
const USER_SCOPES: &[&str] = &["api", "read_api", "read_user"];

/// `(operation, major, minor, tier, note)` availability rows.
const AVAILABILITY_ROWS: &[(&str, u32, u32, Tier, Option<&str>)] = &[
    ("browse_projects", 8, 0, Tier::Base, None),
    ("manage_project", 8, 0, Tier::Base, None),
    ("browse_merge_requests", 8, 0, Tier::Base, None),
    ("manage_merge_request", 8, 0, Tier::Base, None),
    ("browse_issues", 8, 0, Tier::Base, None),
    ("manage_issue", 8, 0, Tier::Base, None),
    ("browse_pipelines", 9, 0, Tier::Base, None),
    ("manage_pipeline", 9, 0, Tier::Base, None),
    ("browse_files", 8, 0, Tier::Base, None),
    ("manage_files", 8, 0, Tier::Base, None),
    ("browse_wiki", 9, 0, Tier::Base, None),
    ("manage_wiki", 9, 0, Tier::Base, None),
    ("browse_labels", 8, 0, Tier::Base, None),
    ("manage_label", 8, 0, Tier::Base, None),
    ("browse_milestones", 8, 0, Tier::Base, None),
    ("manage_milestone", 8, 0, Tier::Base, None),
    ("browse_work_items", 15, 9, Tier::Base, Some("work items API (GraphQL)")),
    ("manage_work_item", 15, 9, Tier::Base, Some("work items API (GraphQL)")),
    ("browse_epics", 12, 0, Tier::Mid, Some("group epics")),
    ("manage_epic", 12, 0, Tier::Mid, Some("group epics")),
    ("browse_iterations", 13, 1, Tier::Mid, Some("iteration cadences")),
    ("manage_iteration", 13, 1, Tier::Mid, Some("iteration cadences")),
    ("browse_mr_approvals", 13, 8, Tier::Mid, Some("approval rules")),
    ("browse_vulnerabilities", 14, 0, Tier::Top, Some("security dashboard")),
    ("manage_vulnerability", 14, 0, Tier::Top, Some("security dashboard")),
];

/// `(operation, scopes)` scope rows.
const SCOPE_ROWS: &[(&str, &[&str])] = &[
    ("browse_projects", READ_SCOPES),
    ("manage_project", WRITE_SCOPES),
    ("browse_merge_requests", READ_SCOPES),
    ("manage_merge_request", WRITE_SCOPES),
    ("browse_issues", READ_SCOPES),
    ("manage_issue", WRITE_SCOPES),
    ("browse_pipelines", READ_SCOPES),
    ("manage_pipeline", WRITE_SCOPES),
    ("browse_files", REPOSITORY_READ_SCOPES),
    ("manage_files", REPOSITORY_WRITE_SCOPES),
    ("browse_wiki", READ_SCOPES),
    ("manage_wiki", WRITE_SCOPES),
    ("browse_labels", READ_SCOPES),
    ("manage_label", WRITE_SCOPES),
    ("browse_milestones", READ_SCOPES),
    ("manage_milestone", WRITE_SCOPES),
    ("browse_work_items", READ_SCOPES),
    ("manage_work_item", WRITE_SCOPES),
    ("browse_epics", READ_SCOPES),
    ("manage_epic", WRITE_SCOPES),
    ("browse_iterations", READ_SCOPES),
    ("manage_iteration", WRITE_SCOPES),
    ("browse_mr_approvals", READ_SCOPES),
    ("browse_vulnerabilities", READ_SCOPES),
    ("manage_vulnerability", WRITE_SCOPES),
    ("browse_users", USER_SCOPES),
];

/// `(operation, parameter, tier, action)` tier-parameter rows.
const TIER_PARAMETER_ROWS: &[(&str, &str, Tier, Option<&str>)] = &[
    ("manage_issue", "weight", Tier::Mid, None),
    ("manage_issue", "epic_id", Tier::Mid, None),
    ("manage_issue", "iteration_id", Tier::Mid, None),
    ("manage_merge_request", "approvals_before_merge", Tier::Mid, Some("create")),
    ("manage_work_item", "health_status", Tier::Top, None),
    ("browse_issues", "weight", Tier::Mid, None),
    ("browse_issues", "iteration_id", Tier::Mid, None),
];

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Returns the built-in availability table.
#[must_use]
pub fn builtin_availability() -> AvailabilityTable {
    let mut table = AvailabilityTable::new();
    for (name, major, minor, tier, note) in AVAILABILITY_ROWS {
        let mut requirement = AvailabilityRequirement::new(TargetVersion::new(*major, *minor), *tier);
        if let Some(note) = note {
            requirement = requirement.with_note(*note);
        }
        table.insert(*name, requirement);
    }
    table
}

/// Returns the built-in scope table.
#[must_use]
pub fn builtin_scopes() -> ScopeTable {
    let mut table = ScopeTable::new();
    for (name, scopes) in SCOPE_ROWS {
        table.insert(*name, ScopeRequirement::any_of(scopes.iter().copied()));
    }
    table
}

/// Returns the built-in tier-parameter table.
#[must_use]
pub fn builtin_tier_parameters() -> TierParameterTable {
    let mut table = TierParameterTable::new();
    for (name, parameter, tier, action) in TIER_PARAMETER_ROWS {
        let mut gate = TierParameter::new(*parameter, *tier);
        if let Some(action) = action {
            gate = gate.on_action(*action);
        }
        table.insert(*name, gate);
    }
    table
}
