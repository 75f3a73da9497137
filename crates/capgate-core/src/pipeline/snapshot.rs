// crates/capgate-core/src/pipeline/snapshot.rs
// ============================================================================
// Module: Policy Snapshot
// Description: Immutable policy inputs and static tables for one rebuild.
// Purpose: Freeze everything a rebuild reads so the pipeline stays pure.
// Dependencies: serde, crate::{core, policy}
// ============================================================================

//! ## Overview
//! A rebuild reads the runtime policy inputs exactly once into a
//! [`PolicySnapshot`], then derives the catalog from the snapshot and the
//! static [`CapabilityTables`]. Nothing in the pipeline observes later input
//! changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::OperationName;
use crate::core::ScopeToken;
use crate::core::TargetState;
use crate::policy::AvailabilityTable;
use crate::policy::CrossReferenceMode;
use crate::policy::DenyRules;
use crate::policy::ScopeTable;
use crate::policy::TierParameterTable;
use crate::policy::UnknownOperationDefault;
use crate::policy::builtin_availability;
use crate::policy::builtin_scopes;
use crate::policy::builtin_tier_parameters;

// ============================================================================
// SECTION: Static Tables
// ============================================================================

/// Static per-operation requirement tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityTables {
    /// Version/tier requirements.
    pub availability: AvailabilityTable,
    /// Acceptable scope sets.
    pub scopes: ScopeTable,
    /// Tier-gated parameters.
    pub tier_parameters: TierParameterTable,
}

impl CapabilityTables {
    /// Returns empty tables (every operation unrestricted except by defaults).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the built-in tables for the stock catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            availability: builtin_availability(),
            scopes: builtin_scopes(),
            tier_parameters: builtin_tier_parameters(),
        }
    }
}

// ============================================================================
// SECTION: Namespace Binding
// ============================================================================

/// Parameter pinned to the session's namespace scope.
///
/// # Invariants
/// - The parameter is hidden from advertised schemas and injected into
///   arguments after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceBinding {
    /// Parameter receiving the namespace value.
    pub parameter: String,
    /// Namespace path (for example `group/project`).
    pub value: String,
}

impl NamespaceBinding {
    /// Builds a binding.
    #[must_use]
    pub fn new(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Policy Snapshot
// ============================================================================

/// Runtime policy inputs captured for one rebuild.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    /// Exclude operations that mutate remote state.
    pub read_only: bool,
    /// Administrator deny rules.
    pub deny: DenyRules,
    /// Connected credential scopes; `None` before the handshake completes.
    pub scopes: Option<BTreeSet<ScopeToken>>,
    /// Connected target state.
    pub target: TargetState,
    /// Decision for operations absent from the availability table.
    pub unknown_operations: UnknownOperationDefault,
    /// Description overrides applied last.
    pub description_overrides: BTreeMap<OperationName, String>,
    /// Cross-reference handling.
    pub cross_references: CrossReferenceMode,
    /// Optional namespace pin.
    pub namespace: Option<NamespaceBinding>,
}

impl PolicySnapshot {
    /// Returns a permissive snapshot: nothing denied, target pending.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            target: TargetState::Pending,
            unknown_operations: UnknownOperationDefault::Allow,
            ..Self::default()
        }
    }
}
