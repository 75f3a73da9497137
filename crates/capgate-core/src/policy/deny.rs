// crates/capgate-core/src/policy/deny.rs
// ============================================================================
// Module: Deny Rules
// Description: Operation-level regex denial and per-action denial.
// Purpose: Compute surviving actions of discriminated schemas.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! Administrators deny whole operations with a name regex, or individual
//! actions with explicit `(operation, action)` pairs. Action denial narrows a
//! discriminated schema to the surviving branches; flat schemas carry no
//! actions and are never affected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use regex::Regex;

use crate::core::ActionName;
use crate::core::OperationName;
use crate::core::ParamSchema;

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Administrator deny rules, read at rebuild time.
#[derive(Debug, Clone, Default)]
pub struct DenyRules {
    /// Operation-level name pattern.
    operation_pattern: Option<Regex>,
    /// Explicit `(operation, action)` denials.
    denied_actions: BTreeSet<(OperationName, ActionName)>,
}

impl DenyRules {
    /// Builds empty rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns rules with the operation-level pattern set.
    #[must_use]
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.operation_pattern = Some(pattern);
        self
    }

    /// Returns rules with one more denied action.
    #[must_use]
    pub fn deny_action(
        mut self,
        operation: impl Into<OperationName>,
        action: impl Into<ActionName>,
    ) -> Self {
        self.denied_actions.insert((operation.into(), action.into()));
        self
    }

    /// Returns the operation-level pattern.
    #[must_use]
    pub const fn operation_pattern(&self) -> Option<&Regex> {
        self.operation_pattern.as_ref()
    }

    /// Returns true when the operation name matches the deny pattern.
    #[must_use]
    pub fn denies_operation(&self, name: &str) -> bool {
        self.operation_pattern.as_ref().is_some_and(|pattern| pattern.is_match(name))
    }

    /// Returns true when the action of the operation is explicitly denied.
    #[must_use]
    pub fn denies_action(&self, operation: &OperationName, action: &ActionName) -> bool {
        self.denied_actions.contains(&(operation.clone(), action.clone()))
    }

    /// Returns the denied actions recorded for an operation.
    #[must_use]
    pub fn denied_actions_for(&self, operation: &OperationName) -> BTreeSet<ActionName> {
        self.denied_actions
            .iter()
            .filter(|(name, _)| name == operation)
            .map(|(_, action)| action.clone())
            .collect()
    }

    /// Returns true when no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operation_pattern.is_none() && self.denied_actions.is_empty()
    }
}

// ============================================================================
// SECTION: Action Filtering
// ============================================================================

/// Result of applying action-level denial to a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionFilter {
    /// No action was removed (always the case for flat schemas).
    Unchanged,
    /// Some actions were removed; the schema keeps the survivors.
    Narrowed {
        /// Schema restricted to surviving branches.
        schema: ParamSchema,
        /// Removed action literals in declaration order.
        removed: Vec<ActionName>,
    },
    /// Every action was removed.
    AllDenied,
}

/// Applies action-level deny rules to an operation's schema.
#[must_use]
pub fn filter_actions(
    rules: &DenyRules,
    operation: &OperationName,
    schema: &ParamSchema,
) -> ActionFilter {
    let actions = schema.action_names();
    if actions.is_empty() {
        return ActionFilter::Unchanged;
    }
    let removed: Vec<ActionName> = actions
        .into_iter()
        .filter(|action| rules.denies_action(operation, action))
        .cloned()
        .collect();
    if removed.is_empty() {
        return ActionFilter::Unchanged;
    }
    let narrowed = schema.retain_actions(|action| !removed.contains(action));
    if narrowed.action_names().is_empty() {
        return ActionFilter::AllDenied;
    }
    ActionFilter::Narrowed {
        schema: narrowed,
        removed,
    }
}
