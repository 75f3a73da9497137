// crates/capgate-core/src/core/operation.rs
// ============================================================================
// Module: Operations and Providers
// Description: Raw operations contributed by capability providers.
// Purpose: Define the immutable operation record and the provider interface.
// Dependencies: async-trait, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Providers are static modules contributing operations once at startup. An
//! [`Operation`] is immutable after contribution; policy stages only ever
//! project it into derived views. Execution is delegated to an
//! [`OperationHandler`], which may perform remote I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::OperationName;
use crate::core::schema::ParamSchema;

// ============================================================================
// SECTION: Handler Interface
// ============================================================================

/// Errors returned by operation handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Arguments failed the handler's own validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Remote work failed.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

/// Execution function of an operation.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Executes the operation with already-decoded JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when arguments are rejected or remote work fails.
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError>;
}

// ============================================================================
// SECTION: Operation
// ============================================================================

/// Named, schema-described operation contributed by a provider.
///
/// # Invariants
/// - Never mutated after contribution; derived views are projections.
#[derive(Clone)]
pub struct Operation {
    /// Unique operation name.
    pub name: OperationName,
    /// Description (may contain `Related:` cross-reference lines).
    pub description: String,
    /// Parameter schema.
    pub schema: ParamSchema,
    /// Whether execution mutates remote data (excluded in read-only mode).
    pub mutates_remote_state: bool,
    /// Execution function.
    pub handler: Arc<dyn OperationHandler>,
}

impl Operation {
    /// Builds a read-only operation.
    #[must_use]
    pub fn new(
        name: impl Into<OperationName>,
        description: impl Into<String>,
        schema: ParamSchema,
        handler: Arc<dyn OperationHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            mutates_remote_state: false,
            handler,
        }
    }

    /// Marks the operation as mutating remote state.
    #[must_use]
    pub fn mutating(mut self) -> Self {
        self.mutates_remote_state = true;
        self
    }

    /// Returns the metadata-only descriptor with the original schema.
    #[must_use]
    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("mutates_remote_state", &self.mutates_remote_state)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Metadata-only view of an operation; never exposes the execution function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDescriptor {
    /// Operation name.
    pub name: OperationName,
    /// Description shown to clients.
    pub description: String,
    /// JSON Schema for the operation arguments.
    pub input_schema: Value,
}

// ============================================================================
// SECTION: Provider Interface
// ============================================================================

/// Static module contributing operations.
pub trait CapabilityProvider: Send + Sync {
    /// Stable provider identifier used in diagnostics.
    fn provider_id(&self) -> &str;

    /// Returns the operations contributed by this provider.
    fn operations(&self) -> Vec<Operation>;
}

/// Provider backed by a fixed list of operations.
pub struct StaticProvider {
    /// Provider identifier.
    id: String,
    /// Contributed operations.
    operations: Vec<Operation>,
}

impl StaticProvider {
    /// Builds a provider from a list of operations.
    #[must_use]
    pub fn new(id: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            id: id.into(),
            operations,
        }
    }
}

impl CapabilityProvider for StaticProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn operations(&self) -> Vec<Operation> {
        self.operations.clone()
    }
}
