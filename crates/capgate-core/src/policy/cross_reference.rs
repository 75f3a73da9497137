// crates/capgate-core/src/policy/cross_reference.rs
// ============================================================================
// Module: Cross-Reference Resolution
// Description: Rewrites "Related:" markers in operation descriptions.
// Purpose: Keep descriptions from pointing at operations the client cannot see.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Descriptions may end with lines of the form `Related: a, b, c` naming
//! other operations. In [`CrossReferenceMode::Rewrite`] mode each marker line
//! keeps only names in the survivor set and disappears when none remain. In
//! [`CrossReferenceMode::Strip`] mode every marker line is removed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix identifying a cross-reference marker line.
pub const RELATED_MARKER: &str = "Related:";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cross-reference handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossReferenceMode {
    /// Rewrite markers against the survivor set.
    #[default]
    Rewrite,
    /// Remove all markers.
    Strip,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Returns the operation names referenced by a description.
#[must_use]
pub fn referenced_names(description: &str) -> Vec<&str> {
    description
        .lines()
        .filter_map(marker_body)
        .flat_map(|body| body.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Resolves marker lines against `is_visible`.
///
/// Descriptions without a marker line are returned verbatim.
#[must_use]
pub fn resolve_cross_references(
    description: &str,
    mode: CrossReferenceMode,
    is_visible: impl Fn(&str) -> bool,
) -> String {
    if !description.lines().any(|line| marker_body(line).is_some()) {
        return description.to_string();
    }
    let mut lines = Vec::new();
    for line in description.lines() {
        let Some(body) = marker_body(line) else {
            lines.push(line.to_string());
            continue;
        };
        if mode == CrossReferenceMode::Strip {
            continue;
        }
        let survivors = body
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty() && is_visible(name))
            .collect::<Vec<_>>();
        if !survivors.is_empty() {
            let indent = &line[.. line.len() - line.trim_start().len()];
            lines.push(format!("{indent}{RELATED_MARKER} {}", survivors.join(", ")));
        }
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Returns the list portion of a marker line.
fn marker_body(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix(RELATED_MARKER)
}
