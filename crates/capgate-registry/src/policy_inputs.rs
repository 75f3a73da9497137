// crates/capgate-registry/src/policy_inputs.rs
// ============================================================================
// Module: Runtime Policy Inputs
// Description: Mutable policy inputs owned by collaborators of the registry.
// Purpose: Hold the values a rebuild freezes into a policy snapshot.
// Dependencies: capgate-config, capgate-core
// ============================================================================

//! ## Overview
//! Policy inputs are updated independently (configuration reloads, preset
//! switches, credential refreshes, target handshakes). The registry copies
//! them into an immutable [`PolicySnapshot`] at the start of each rebuild.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use capgate_config::EffectivePolicy;
use capgate_core::CrossReferenceMode;
use capgate_core::DenyRules;
use capgate_core::NamespaceBinding;
use capgate_core::OperationName;
use capgate_core::PolicySnapshot;
use capgate_core::ScopeToken;
use capgate_core::TargetState;
use capgate_core::UnknownOperationDefault;

// ============================================================================
// SECTION: Policy Inputs
// ============================================================================

/// Runtime policy inputs read at rebuild time.
///
/// # Invariants
/// - `scopes == None` means the credential handshake has not completed; the
///   scope stage is skipped rather than treated as an empty grant.
#[derive(Debug, Clone, Default)]
pub struct PolicyInputs {
    /// Active preset name.
    pub preset: Option<String>,
    /// Exclude operations that mutate remote state.
    pub read_only: bool,
    /// Operation and action deny rules.
    pub deny: DenyRules,
    /// Connected credential scopes.
    pub scopes: Option<BTreeSet<ScopeToken>>,
    /// Connected target state.
    pub target: TargetState,
    /// Decision for operations without an availability entry.
    pub unknown_operations: UnknownOperationDefault,
    /// Description overrides keyed by operation.
    pub description_overrides: BTreeMap<OperationName, String>,
    /// Cross-reference handling.
    pub cross_references: CrossReferenceMode,
    /// Session namespace pin.
    pub namespace: Option<NamespaceBinding>,
}

impl PolicyInputs {
    /// Returns inputs for the startup handshake window: nothing denied and
    /// the target pending.
    #[must_use]
    pub fn handshake() -> Self {
        Self {
            target: TargetState::Pending,
            ..Self::default()
        }
    }

    /// Builds inputs from a resolved configuration policy.
    ///
    /// The target starts pending; scopes start unknown.
    #[must_use]
    pub fn from_policy(policy: EffectivePolicy) -> Self {
        let mut inputs = Self::handshake();
        inputs.apply_policy(policy);
        inputs
    }

    /// Replaces the configuration-derived fields, keeping connection state
    /// and the namespace pin.
    pub fn apply_policy(&mut self, policy: EffectivePolicy) {
        self.preset = policy.preset;
        self.read_only = policy.read_only;
        self.deny = policy.deny;
        self.description_overrides = policy.description_overrides;
        self.cross_references = policy.cross_references;
        self.unknown_operations = policy.unknown_operations;
    }

    /// Sets the connected scope set.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScopeToken>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the connected target state.
    #[must_use]
    pub fn with_target(mut self, target: TargetState) -> Self {
        self.target = target;
        self
    }

    /// Freezes the inputs into a pipeline snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            read_only: self.read_only,
            deny: self.deny.clone(),
            scopes: self.scopes.clone(),
            target: self.target,
            unknown_operations: self.unknown_operations,
            description_overrides: self.description_overrides.clone(),
            cross_references: self.cross_references,
            namespace: self.namespace.clone(),
        }
    }
}
