// crates/capgate-core/src/lib.rs
// ============================================================================
// Module: Capability Gate Core Library
// Description: Public API surface for the Capability Gate core.
// Purpose: Expose the operation model, policies, and the filter pipeline.
// Dependencies: crate::{core, pipeline, policy}
// ============================================================================

//! ## Overview
//! Capability Gate core models named, schema-described operations contributed
//! by providers and derives the subset a connected client may see. Every
//! policy is a pure function; the pipeline performs no I/O and holds no
//! state, leaving caching and refresh to the registry crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod pipeline;
pub mod policy;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use pipeline::CapabilityTables;
pub use pipeline::DerivedOperation;
pub use pipeline::Exclusion;
pub use pipeline::ExclusionReason;
pub use pipeline::FILTER_STAGES;
pub use pipeline::FilterStage;
pub use pipeline::FilterStatistics;
pub use pipeline::NamespaceBinding;
pub use pipeline::PipelineOutput;
pub use pipeline::PolicySnapshot;
pub use pipeline::exclusion_for;
pub use pipeline::run_pipeline;
pub use policy::AvailabilityDecision;
pub use policy::AvailabilityDenial;
pub use policy::AvailabilityRequirement;
pub use policy::AvailabilityTable;
pub use policy::CrossReferenceMode;
pub use policy::DenyRules;
pub use policy::ScopeRequirement;
pub use policy::ScopeTable;
pub use policy::TierParameter;
pub use policy::TierParameterTable;
pub use policy::UnknownOperationDefault;
