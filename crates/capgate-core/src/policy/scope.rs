// crates/capgate-core/src/policy/scope.rs
// ============================================================================
// Module: Scope Policy
// Description: Credential-scope requirements per operation.
// Purpose: Decide whether connected credential scopes satisfy an operation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each entry lists the scope tokens that are individually sufficient for an
//! operation. An operation is available when the entry is empty or any
//! listed scope is held by the credential.
//!
//! ## Invariants
//! - Absence of an entry is not an empty entry: operations missing from the
//!   table are always allowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::OperationName;
use crate::core::ScopeToken;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Acceptable scope set for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeRequirement(BTreeSet<ScopeToken>);

impl ScopeRequirement {
    /// Builds a requirement from scope labels.
    #[must_use]
    pub fn any_of<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScopeToken>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    /// Returns the acceptable scopes.
    #[must_use]
    pub const fn scopes(&self) -> &BTreeSet<ScopeToken> {
        &self.0
    }

    /// Returns true when the connected scopes satisfy this requirement.
    #[must_use]
    pub fn is_satisfied_by(&self, connected: &BTreeSet<ScopeToken>) -> bool {
        self.0.is_empty() || self.0.iter().any(|scope| connected.contains(scope))
    }
}

/// Per-operation scope table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTable {
    /// Requirements keyed by operation name.
    entries: BTreeMap<OperationName, ScopeRequirement>,
}

impl ScopeTable {
    /// Builds an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a requirement.
    pub fn insert(&mut self, name: impl Into<OperationName>, requirement: ScopeRequirement) {
        self.entries.insert(name.into(), requirement);
    }

    /// Returns the requirement for an operation, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ScopeRequirement> {
        self.entries.get(name)
    }

    /// Returns true when `connected` satisfies the operation's requirement.
    ///
    /// Operations without an entry are always allowed.
    #[must_use]
    pub fn allows(&self, name: &str, connected: &BTreeSet<ScopeToken>) -> bool {
        self.get(name).is_none_or(|requirement| requirement.is_satisfied_by(connected))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
