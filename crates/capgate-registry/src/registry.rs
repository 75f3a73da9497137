// crates/capgate-registry/src/registry.rs
// ============================================================================
// Module: Capability Registry
// Description: Cached, policy-filtered catalog with lookup, execute, and list.
// Purpose: Own the derived catalog and its atomic rebuild-and-swap lifecycle.
// Dependencies: capgate-core, jsonschema, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The registry aggregates provider operations once at startup and serves
//! every read from an immutable [`CatalogSnapshot`]. A rebuild reads the
//! current [`PolicyInputs`] once, derives a complete snapshot off to the
//! side, and swaps a single `Arc`. Readers clone the `Arc` and release the
//! lock before doing any work, so no lock is held across an `await`.
//!
//! Security posture: unknown and filtered-out operations produce the same
//! not-found error so hidden capabilities are not disclosed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use capgate_core::CapabilityProvider;
use capgate_core::CapabilityTables;
use capgate_core::DerivedOperation;
use capgate_core::Exclusion;
use capgate_core::FilterStatistics;
use capgate_core::HandlerError;
use capgate_core::Operation;
use capgate_core::OperationDescriptor;
use capgate_core::OperationName;
use capgate_core::run_pipeline;
use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::audit::CatalogAuditSink;
use crate::audit::CatalogNoopAuditSink;
use crate::audit::ExclusionAuditEvent;
use crate::audit::ExecuteAuditEvent;
use crate::audit::RebuildAuditEvent;
use crate::audit::RebuildTrigger;
use crate::policy_inputs::PolicyInputs;
use crate::telemetry::CatalogMetrics;
use crate::telemetry::ExecutionMetricEvent;
use crate::telemetry::ExecutionOutcome;
use crate::telemetry::NoopCatalogMetrics;
use crate::telemetry::RebuildMetricEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Buffered change notifications per subscriber.
const NOTIFICATION_BUFFER: usize = 16;

/// Maximum validation messages joined into one error.
const MAX_VALIDATION_MESSAGES: usize = 8;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by the capability registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Operation is absent from the current catalog.
    #[error("operation not found: {0}")]
    NotFound(String),
    /// Arguments failed the operation schema.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Requested action was removed by deny rules.
    #[error("action {action} denied for operation {operation}")]
    DeniedAction {
        /// Operation name.
        operation: String,
        /// Denied action value.
        action: String,
    },
    /// Provider execution failed.
    #[error("upstream failure: {0}")]
    Upstream(String),
    /// Two providers contributed the same operation name.
    #[error("duplicate operation {name} contributed by provider {provider}")]
    DuplicateOperation {
        /// Colliding operation name.
        name: String,
        /// Provider contributing the duplicate.
        provider: String,
    },
    /// Internal invariant failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Returns the stable error code label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_failed",
            Self::DeniedAction {
                ..
            } => "denied_action",
            Self::Upstream(_) => "upstream_failed",
            Self::DuplicateOperation {
                ..
            } => "duplicate_operation",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<HandlerError> for RegistryError {
    fn from(error: HandlerError) -> Self {
        match error {
            HandlerError::InvalidArguments(message) => Self::Validation(message),
            HandlerError::Upstream(message) => Self::Upstream(message),
        }
    }
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

/// Payload-free signal that the visible catalog changed.
///
/// Listeners re-fetch [`CapabilityRegistry::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitiesChanged;

// ============================================================================
// SECTION: Catalog Snapshot
// ============================================================================

/// One cached derived operation with its lazily compiled validator.
struct CatalogEntry {
    /// Derived operation.
    operation: DerivedOperation,
    /// Compiled argument validator, or the compile error.
    validator: OnceLock<Result<Validator, String>>,
}

/// Immutable catalog produced by one rebuild.
///
/// # Invariants
/// - Never mutated after construction; replaced wholesale on rebuild.
/// - `statistics.available == operations().len()`.
pub struct CatalogSnapshot {
    /// Monotonic rebuild generation.
    generation: u64,
    /// Derived operations in provider order.
    entries: Vec<CatalogEntry>,
    /// Name to entry index.
    index: HashMap<OperationName, usize>,
    /// Exclusion ledger.
    exclusions: Vec<Exclusion>,
    /// Aggregate counts.
    statistics: FilterStatistics,
}

impl CatalogSnapshot {
    /// Builds a snapshot from operations, tables, and frozen policy inputs.
    fn build(
        generation: u64,
        operations: &[Operation],
        tables: &CapabilityTables,
        inputs: &PolicyInputs,
    ) -> Self {
        let output = run_pipeline(operations, tables, &inputs.snapshot());
        let index = output
            .operations
            .iter()
            .enumerate()
            .map(|(position, operation)| (operation.name.clone(), position))
            .collect();
        let entries = output
            .operations
            .into_iter()
            .map(|operation| CatalogEntry {
                operation,
                validator: OnceLock::new(),
            })
            .collect();
        Self {
            generation,
            entries,
            index,
            exclusions: output.exclusions,
            statistics: output.statistics,
        }
    }

    /// Returns the rebuild generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the derived operation for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DerivedOperation> {
        self.entry(name).map(|entry| &entry.operation)
    }

    /// Returns the derived operations in catalog order.
    pub fn operations(&self) -> impl Iterator<Item = &DerivedOperation> {
        self.entries.iter().map(|entry| &entry.operation)
    }

    /// Returns the exclusion ledger.
    #[must_use]
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Returns the aggregate filter statistics.
    #[must_use]
    pub const fn statistics(&self) -> FilterStatistics {
        self.statistics
    }

    /// Returns the cache entry for `name`.
    fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.index.get(name).and_then(|position| self.entries.get(*position))
    }
}

/// Compiles the argument validator for a derived operation.
fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("invalid schema: {err}"))
}

impl CatalogEntry {
    /// Validates arguments against the derived schema.
    fn validate(&self, args: &Value) -> Result<(), RegistryError> {
        let validator = self
            .validator
            .get_or_init(|| compile_schema(&self.operation.schema.to_json_schema()))
            .as_ref()
            .map_err(|err| RegistryError::Internal(err.clone()))?;
        if validator.is_valid(args) {
            return Ok(());
        }
        let messages: Vec<String> = validator
            .iter_errors(args)
            .take(MAX_VALIDATION_MESSAGES)
            .map(|err| err.to_string())
            .collect();
        Err(RegistryError::Validation(messages.join("; ")))
    }

    /// Rejects arguments selecting an action removed by deny rules.
    fn check_action(&self, args: &Value) -> Result<(), RegistryError> {
        let Some(discriminator) = self.operation.schema.discriminator() else {
            return Ok(());
        };
        let Some(action) = args.get(discriminator).and_then(Value::as_str) else {
            return Ok(());
        };
        if self.operation.is_action_removed(action) {
            return Err(RegistryError::DeniedAction {
                operation: self.operation.name.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Policy-filtered capability registry.
///
/// # Invariants
/// - Operation names are unique across providers.
/// - Readers observe either a complete old snapshot or a complete new one.
/// - Installed snapshot generations never decrease.
pub struct CapabilityRegistry {
    /// Raw operations in provider order.
    operations: Vec<Operation>,
    /// Static requirement tables.
    tables: CapabilityTables,
    /// Current runtime policy inputs.
    inputs: RwLock<PolicyInputs>,
    /// Installed catalog snapshot; `None` until first access.
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
    /// Last generation handed out.
    generation: AtomicU64,
    /// Change notification channel.
    changes: broadcast::Sender<CapabilitiesChanged>,
    /// Audit sink.
    audit: Arc<dyn CatalogAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn CatalogMetrics>,
    /// Emit one audit event per excluded operation.
    log_exclusions: bool,
}

impl CapabilityRegistry {
    /// Aggregates provider operations into one namespace.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateOperation`] when two providers
    /// contribute the same name.
    pub fn initialize(
        providers: &[Arc<dyn CapabilityProvider>],
        tables: CapabilityTables,
        inputs: PolicyInputs,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut operations = Vec::new();
        for provider in providers {
            for operation in provider.operations() {
                if !seen.insert(operation.name.clone()) {
                    return Err(RegistryError::DuplicateOperation {
                        name: operation.name.to_string(),
                        provider: provider.provider_id().to_string(),
                    });
                }
                operations.push(operation);
            }
        }
        let (changes, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Ok(Self {
            operations,
            tables,
            inputs: RwLock::new(inputs),
            snapshot: RwLock::new(None),
            generation: AtomicU64::new(0),
            changes,
            audit: Arc::new(CatalogNoopAuditSink),
            metrics: Arc::new(NoopCatalogMetrics),
            log_exclusions: false,
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn CatalogAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn CatalogMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Enables per-exclusion audit events on rebuild.
    #[must_use]
    pub const fn with_exclusion_logging(mut self, enabled: bool) -> Self {
        self.log_exclusions = enabled;
        self
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Returns the current snapshot, building it on first access.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let installed =
            self.snapshot.read().unwrap_or_else(PoisonError::into_inner).as_ref().map(Arc::clone);
        installed.unwrap_or_else(|| self.rebuild(RebuildTrigger::Lazy))
    }

    /// Returns the derived operation for `name` from the cache.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DerivedOperation> {
        self.snapshot().get(name).cloned()
    }

    /// Returns metadata for every visible operation in catalog order.
    #[must_use]
    pub fn list(&self) -> Vec<OperationDescriptor> {
        self.snapshot().operations().map(DerivedOperation::descriptor).collect()
    }

    /// Returns metadata for every provider operation with original schemas.
    ///
    /// Bypasses every policy stage; intended for documentation tooling only.
    #[must_use]
    pub fn list_unfiltered(&self) -> Vec<OperationDescriptor> {
        self.operations.iter().map(Operation::descriptor).collect()
    }

    /// Returns the raw provider operations.
    #[must_use]
    pub fn raw_operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the audit sink shared with runtime components.
    #[must_use]
    pub fn audit_sink(&self) -> Arc<dyn CatalogAuditSink> {
        Arc::clone(&self.audit)
    }

    /// Returns the static requirement tables.
    #[must_use]
    pub const fn tables(&self) -> &CapabilityTables {
        &self.tables
    }

    /// Returns statistics for the current snapshot.
    #[must_use]
    pub fn filter_statistics(&self) -> FilterStatistics {
        self.snapshot().statistics()
    }

    /// Returns the exclusion ledger of the current snapshot.
    #[must_use]
    pub fn exclusions(&self) -> Vec<Exclusion> {
        self.snapshot().exclusions().to_vec()
    }

    /// Returns the generation of the installed snapshot (0 before first build).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |snapshot| snapshot.generation)
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Executes a visible operation.
    ///
    /// Denied actions are rejected before schema validation; the namespace
    /// pin is injected after validation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the operation is not visible, the
    /// arguments are rejected, or the handler fails.
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, RegistryError> {
        let started = Instant::now();
        let result = self.execute_inner(name, args).await;
        let (outcome, error_code) = match &result {
            Ok(_) => (ExecutionOutcome::Ok, None),
            Err(err) => (ExecutionOutcome::Error, Some(err.code())),
        };
        let operation = OperationName::new(name);
        self.audit.record_execute(&ExecuteAuditEvent::new(operation.clone(), outcome, error_code));
        self.metrics.record_execution(
            ExecutionMetricEvent {
                operation,
                outcome,
                error_code,
            },
            started.elapsed(),
        );
        result
    }

    /// Resolves, checks, and invokes an operation.
    async fn execute_inner(&self, name: &str, mut args: Value) -> Result<Value, RegistryError> {
        let snapshot = self.snapshot();
        let entry = snapshot.entry(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry.check_action(&args)?;
        entry.validate(&args)?;
        if let Some(pin) = &entry.operation.pinned
            && let Value::Object(map) = &mut args
            && !map.contains_key(&pin.parameter)
        {
            map.insert(pin.parameter.clone(), Value::String(pin.value.clone()));
        }
        let handler = Arc::clone(&entry.operation.handler);
        drop(snapshot);
        handler.invoke(args).await.map_err(RegistryError::from)
    }

    // ------------------------------------------------------------------------
    // Rebuild
    // ------------------------------------------------------------------------

    /// Discards the cache and derives a new snapshot from current inputs.
    ///
    /// Concurrent rebuilds are safe; a snapshot built from older inputs never
    /// replaces one built from newer inputs.
    pub fn rebuild(&self, trigger: RebuildTrigger) -> Arc<CatalogSnapshot> {
        let started = Instant::now();
        let (inputs, generation) = {
            let guard = self.inputs.read().unwrap_or_else(PoisonError::into_inner);
            (guard.clone(), self.generation.fetch_add(1, Ordering::SeqCst) + 1)
        };
        let built =
            Arc::new(CatalogSnapshot::build(generation, &self.operations, &self.tables, &inputs));
        let installed = {
            let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(current) if current.generation > generation => Arc::clone(current),
                _ => {
                    *slot = Some(Arc::clone(&built));
                    Arc::clone(&built)
                }
            }
        };
        if Arc::ptr_eq(&installed, &built) {
            self.record_rebuild(&built, trigger, inputs.preset, started);
        }
        installed
    }

    /// Emits audit and metrics for an installed snapshot.
    fn record_rebuild(
        &self,
        snapshot: &CatalogSnapshot,
        trigger: RebuildTrigger,
        preset: Option<String>,
        started: Instant,
    ) {
        self.audit.record_rebuild(&RebuildAuditEvent::new(
            snapshot.generation,
            trigger,
            preset,
            snapshot.statistics,
        ));
        if self.log_exclusions {
            for exclusion in &snapshot.exclusions {
                self.audit.record_exclusion(&ExclusionAuditEvent::new(
                    snapshot.generation,
                    exclusion.operation.clone(),
                    exclusion.reason,
                    exclusion.detail.clone(),
                ));
            }
        }
        self.metrics.record_rebuild(
            RebuildMetricEvent {
                generation: snapshot.generation,
                statistics: snapshot.statistics,
            },
            started.elapsed(),
        );
    }

    // ------------------------------------------------------------------------
    // Policy Inputs
    // ------------------------------------------------------------------------

    /// Returns a copy of the current policy inputs.
    #[must_use]
    pub fn inputs(&self) -> PolicyInputs {
        self.inputs.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Mutates the policy inputs without rebuilding.
    pub fn update_inputs<R>(&self, update: impl FnOnce(&mut PolicyInputs) -> R) -> R {
        let mut guard = self.inputs.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut guard)
    }

    /// Mutates the policy inputs, rebuilds, and notifies listeners once.
    pub fn apply_inputs(
        &self,
        trigger: RebuildTrigger,
        update: impl FnOnce(&mut PolicyInputs),
    ) -> Arc<CatalogSnapshot> {
        self.update_inputs(update);
        let snapshot = self.rebuild(trigger);
        self.notify_changed();
        snapshot
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Subscribes to capability change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CapabilitiesChanged> {
        self.changes.subscribe()
    }

    /// Emits one change notification; no-op without subscribers.
    pub fn notify_changed(&self) {
        let _ = self.changes.send(CapabilitiesChanged);
    }
}
