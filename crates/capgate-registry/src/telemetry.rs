// crates/capgate-registry/src/telemetry.rs
// ============================================================================
// Module: Catalog Telemetry
// Description: Observability hooks for catalog rebuilds and executions.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: capgate-core
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for execution counters and
//! rebuild latencies. Deployments plug in their own exporter by implementing
//! [`CatalogMetrics`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use capgate_core::FilterStatistics;
use capgate_core::OperationName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for catalog histograms.
pub const CATALOG_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Execution outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Handler returned a result.
    Ok,
    /// Execution failed.
    Error,
}

impl ExecutionOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Execution metric event payload.
#[derive(Debug, Clone)]
pub struct ExecutionMetricEvent {
    /// Operation requested.
    pub operation: OperationName,
    /// Execution outcome.
    pub outcome: ExecutionOutcome,
    /// Stable error code when the execution failed.
    pub error_code: Option<&'static str>,
}

/// Rebuild metric event payload.
#[derive(Debug, Clone, Copy)]
pub struct RebuildMetricEvent {
    /// Snapshot generation produced by the rebuild.
    pub generation: u64,
    /// Statistics of the new snapshot.
    pub statistics: FilterStatistics,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for catalog activity.
pub trait CatalogMetrics: Send + Sync {
    /// Records an execution with its latency.
    fn record_execution(&self, event: ExecutionMetricEvent, latency: Duration);
    /// Records a rebuild with its latency.
    fn record_rebuild(&self, event: RebuildMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopCatalogMetrics;

impl CatalogMetrics for NoopCatalogMetrics {
    fn record_execution(&self, _event: ExecutionMetricEvent, _latency: Duration) {}

    fn record_rebuild(&self, _event: RebuildMetricEvent, _latency: Duration) {}
}
