// crates/capgate-registry/src/audit.rs
// ============================================================================
// Module: Catalog Audit Logging
// Description: Structured audit events for catalog rebuilds, refreshes, and executions.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: capgate-config, capgate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are plain serializable payloads routed through a
//! [`CatalogAuditSink`]. Sinks write one JSON object per line so deployments
//! can ship them to any log pipeline. Exclusion events are debug severity and
//! only emitted on request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use capgate_config::AuditConfig;
use capgate_core::ExclusionReason;
use capgate_core::FilterStatistics;
use capgate_core::OperationName;
use serde::Serialize;

use crate::telemetry::ExecutionOutcome;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Audit severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    /// Diagnostic detail.
    Debug,
    /// Normal activity.
    Info,
    /// Degraded but recovered activity.
    Warn,
}

/// What caused a catalog rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildTrigger {
    /// First access built the catalog.
    Lazy,
    /// A caller requested a rebuild.
    Explicit,
    /// Credential scopes changed.
    ScopeChange,
    /// The active preset changed.
    PresetSwitch,
    /// The namespace scope changed.
    NamespaceScope,
    /// The connected target's version or tier changed.
    TargetChange,
}

/// Outcome of a credential refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Scopes and target unchanged; no rebuild.
    Unchanged,
    /// Scopes or target changed; catalog rebuilt.
    Changed,
    /// Remote query failed; treated as unchanged.
    Failed,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Catalog rebuild audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event severity.
    pub severity: AuditSeverity,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Snapshot generation produced.
    pub generation: u64,
    /// Rebuild trigger.
    pub trigger: RebuildTrigger,
    /// Active preset, if any.
    pub preset: Option<String>,
    /// Statistics of the new snapshot.
    pub statistics: FilterStatistics,
}

impl RebuildAuditEvent {
    /// Builds a rebuild event.
    #[must_use]
    pub fn new(
        generation: u64,
        trigger: RebuildTrigger,
        preset: Option<String>,
        statistics: FilterStatistics,
    ) -> Self {
        Self {
            event: "catalog_rebuild",
            severity: AuditSeverity::Info,
            timestamp_ms: now_ms(),
            generation,
            trigger,
            preset,
            statistics,
        }
    }
}

/// Per-operation exclusion audit event.
#[derive(Debug, Clone, Serialize)]
pub struct ExclusionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event severity.
    pub severity: AuditSeverity,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Snapshot generation.
    pub generation: u64,
    /// Excluded operation.
    pub operation: OperationName,
    /// Exclusion reason label.
    pub reason: ExclusionReason,
    /// Human-readable detail.
    pub detail: String,
}

impl ExclusionAuditEvent {
    /// Builds an exclusion event.
    #[must_use]
    pub fn new(
        generation: u64,
        operation: OperationName,
        reason: ExclusionReason,
        detail: String,
    ) -> Self {
        Self {
            event: "catalog_exclusion",
            severity: AuditSeverity::Debug,
            timestamp_ms: now_ms(),
            generation,
            operation,
            reason,
            detail,
        }
    }
}

/// Credential refresh audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event severity.
    pub severity: AuditSeverity,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Refresh outcome.
    pub outcome: RefreshOutcome,
    /// Scope count before the refresh.
    pub previous_scopes: Option<usize>,
    /// Scope count after the refresh.
    pub current_scopes: Option<usize>,
    /// Error message when the refresh failed.
    pub error: Option<String>,
}

impl RefreshAuditEvent {
    /// Builds a refresh event; failures are warn severity.
    #[must_use]
    pub fn new(
        outcome: RefreshOutcome,
        previous_scopes: Option<usize>,
        current_scopes: Option<usize>,
        error: Option<String>,
    ) -> Self {
        let severity = match outcome {
            RefreshOutcome::Failed => AuditSeverity::Warn,
            RefreshOutcome::Changed | RefreshOutcome::Unchanged => AuditSeverity::Info,
        };
        Self {
            event: "credential_refresh",
            severity,
            timestamp_ms: now_ms(),
            outcome,
            previous_scopes,
            current_scopes,
            error,
        }
    }
}

/// Operation execution audit event.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event severity.
    pub severity: AuditSeverity,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation requested.
    pub operation: OperationName,
    /// Execution outcome.
    pub outcome: ExecutionOutcome,
    /// Stable error code when the execution failed.
    pub error_code: Option<&'static str>,
}

impl ExecuteAuditEvent {
    /// Builds an execution event.
    #[must_use]
    pub fn new(
        operation: OperationName,
        outcome: ExecutionOutcome,
        error_code: Option<&'static str>,
    ) -> Self {
        Self {
            event: "capability_execute",
            severity: AuditSeverity::Info,
            timestamp_ms: now_ms(),
            operation,
            outcome,
            error_code,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for catalog events.
pub trait CatalogAuditSink: Send + Sync {
    /// Records a rebuild event.
    fn record_rebuild(&self, event: &RebuildAuditEvent);

    /// Records an exclusion event.
    fn record_exclusion(&self, _event: &ExclusionAuditEvent) {}

    /// Records a credential refresh event.
    fn record_refresh(&self, _event: &RefreshAuditEvent) {}

    /// Records an execution event.
    fn record_execute(&self, _event: &ExecuteAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct CatalogStderrAuditSink;

impl CatalogStderrAuditSink {
    /// Writes one serialized event to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl CatalogAuditSink for CatalogStderrAuditSink {
    fn record_rebuild(&self, event: &RebuildAuditEvent) {
        Self::emit(event);
    }

    fn record_exclusion(&self, event: &ExclusionAuditEvent) {
        Self::emit(event);
    }

    fn record_refresh(&self, event: &RefreshAuditEvent) {
        Self::emit(event);
    }

    fn record_execute(&self, event: &ExecuteAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct CatalogFileAuditSink {
    /// Append-only audit log file.
    file: Mutex<std::fs::File>,
}

impl CatalogFileAuditSink {
    /// Opens a file-backed audit sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event to the file.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl CatalogAuditSink for CatalogFileAuditSink {
    fn record_rebuild(&self, event: &RebuildAuditEvent) {
        self.emit(event);
    }

    fn record_exclusion(&self, event: &ExclusionAuditEvent) {
        self.emit(event);
    }

    fn record_refresh(&self, event: &RefreshAuditEvent) {
        self.emit(event);
    }

    fn record_execute(&self, event: &ExecuteAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct CatalogNoopAuditSink;

impl CatalogAuditSink for CatalogNoopAuditSink {
    fn record_rebuild(&self, _event: &RebuildAuditEvent) {}
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Builds the audit sink selected by `[audit]`.
///
/// # Errors
///
/// Returns an error when the configured audit file cannot be opened.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn CatalogAuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(CatalogNoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(CatalogFileAuditSink::new(Path::new(path))?)),
        None => Ok(Arc::new(CatalogStderrAuditSink)),
    }
}
