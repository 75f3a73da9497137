// crates/capgate-core/src/pipeline/mod.rs
// ============================================================================
// Module: Catalog Pipeline
// Description: Policy snapshot, ordered stages, and filter statistics.
// Purpose: Derive the exposed catalog from raw operations in one pure pass.
// Dependencies: crate::pipeline::*
// ============================================================================

//! ## Overview
//! The pipeline is a pure function from raw operations, static tables, and a
//! [`PolicySnapshot`] to a [`PipelineOutput`]. Callers own caching and
//! invalidation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod snapshot;
pub mod stages;
pub mod stats;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use snapshot::CapabilityTables;
pub use snapshot::NamespaceBinding;
pub use snapshot::PolicySnapshot;
pub use stages::DerivedOperation;
pub use stages::FILTER_STAGES;
pub use stages::FilterStage;
pub use stages::PipelineOutput;
pub use stages::exclusion_for;
pub use stages::run_pipeline;
pub use stats::Exclusion;
pub use stats::ExclusionReason;
pub use stats::FilterStatistics;
