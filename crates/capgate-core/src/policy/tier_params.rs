// crates/capgate-core/src/policy/tier_params.rs
// ============================================================================
// Module: Tier-Restricted Parameters
// Description: Parameters that exist only on higher target tiers.
// Purpose: Strip gated parameters without dropping the operation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Some operations are available on every tier but accept extra parameters
//! on higher tiers (for example `weight` on issues). Those parameters are
//! removed from the advertised schema when the connected tier is too low.
//! While the handshake is pending parameters are kept; an undetermined target
//! strips them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ActionName;
use crate::core::OperationName;
use crate::core::ParamSchema;
use crate::core::TargetState;
use crate::core::Tier;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One tier-gated parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierParameter {
    /// Parameter name.
    pub parameter: String,
    /// Minimum tier exposing the parameter.
    pub min_tier: Tier,
    /// Restrict the gate to one action branch; `None` gates every branch.
    #[serde(default)]
    pub action: Option<ActionName>,
}

impl TierParameter {
    /// Builds a parameter gate covering every branch.
    #[must_use]
    pub fn new(parameter: impl Into<String>, min_tier: Tier) -> Self {
        Self {
            parameter: parameter.into(),
            min_tier,
            action: None,
        }
    }

    /// Returns a copy restricted to one action branch.
    #[must_use]
    pub fn on_action(mut self, action: impl Into<ActionName>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Returns true when the parameter must be stripped for the target.
    #[must_use]
    pub const fn is_stripped_for(&self, target: &TargetState) -> bool {
        match target {
            TargetState::Pending => false,
            TargetState::Unknown => true,
            TargetState::Connected(info) => !info.tier.satisfies(self.min_tier),
        }
    }
}

/// Per-operation tier-gated parameter table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierParameterTable {
    /// Gated parameters keyed by operation name.
    entries: BTreeMap<OperationName, Vec<TierParameter>>,
}

impl TierParameterTable {
    /// Builds an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a gated parameter for an operation.
    pub fn insert(&mut self, name: impl Into<OperationName>, parameter: TierParameter) {
        self.entries.entry(name.into()).or_default().push(parameter);
    }

    /// Returns the gated parameters of an operation.
    #[must_use]
    pub fn get(&self, name: &str) -> &[TierParameter] {
        self.entries.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Stripping
// ============================================================================

/// Removes gated parameters the target cannot use.
///
/// Returns the narrowed schema and the names of the stripped parameters.
/// Parameters absent from the schema are ignored.
#[must_use]
pub fn strip_tier_parameters(
    table: &TierParameterTable,
    name: &str,
    schema: ParamSchema,
    target: &TargetState,
) -> (ParamSchema, Vec<String>) {
    let mut schema = schema;
    let mut stripped = Vec::new();
    for gate in table.get(name) {
        if !gate.is_stripped_for(target) || !schema.has_parameter(&gate.parameter) {
            continue;
        }
        schema = schema.without_parameter(&gate.parameter, gate.action.as_ref());
        if !stripped.contains(&gate.parameter) {
            stripped.push(gate.parameter.clone());
        }
    }
    (schema, stripped)
}
