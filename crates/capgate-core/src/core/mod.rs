// crates/capgate-core/src/core/mod.rs
// ============================================================================
// Module: Capability Gate Core Types
// Description: Identifiers, schemas, operations, and target metadata.
// Purpose: Group the immutable data model shared by every policy stage.
// Dependencies: crate::core::{identifiers, operation, schema, target}
// ============================================================================

//! ## Overview
//! Core types are immutable values. Providers contribute [`Operation`]s once;
//! the policy pipeline projects them into derived views without mutation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod operation;
pub mod schema;
pub mod target;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::ActionName;
pub use identifiers::OperationName;
pub use identifiers::ScopeToken;
pub use operation::CapabilityProvider;
pub use operation::HandlerError;
pub use operation::Operation;
pub use operation::OperationDescriptor;
pub use operation::OperationHandler;
pub use operation::StaticProvider;
pub use schema::DEFAULT_DISCRIMINATOR;
pub use schema::ObjectSchema;
pub use schema::ParamField;
pub use schema::ParamSchema;
pub use schema::SchemaBranch;
pub use target::TargetInfo;
pub use target::TargetState;
pub use target::TargetVersion;
pub use target::Tier;
