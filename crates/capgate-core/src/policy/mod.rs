// crates/capgate-core/src/policy/mod.rs
// ============================================================================
// Module: Capability Policies
// Description: Pure policy evaluators used by the filter pipeline.
// Purpose: Group availability, scope, deny, parameter, and reference policies.
// Dependencies: crate::policy::*
// ============================================================================

//! ## Overview
//! Every policy here is a pure function over static tables and a runtime
//! input. None of them perform I/O or fail; undetermined inputs map to a
//! conservative decision.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod availability;
pub mod builtin;
pub mod cross_reference;
pub mod deny;
pub mod scope;
pub mod tier_params;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use availability::AvailabilityDecision;
pub use availability::AvailabilityDenial;
pub use availability::AvailabilityRequirement;
pub use availability::AvailabilityTable;
pub use availability::UnknownOperationDefault;
pub use availability::evaluate_availability;
pub use builtin::builtin_availability;
pub use builtin::builtin_scopes;
pub use builtin::builtin_tier_parameters;
pub use cross_reference::CrossReferenceMode;
pub use cross_reference::RELATED_MARKER;
pub use cross_reference::referenced_names;
pub use cross_reference::resolve_cross_references;
pub use deny::ActionFilter;
pub use deny::DenyRules;
pub use deny::filter_actions;
pub use scope::ScopeRequirement;
pub use scope::ScopeTable;
pub use tier_params::TierParameter;
pub use tier_params::TierParameterTable;
pub use tier_params::strip_tier_parameters;
