// crates/capgate-registry/src/lib.rs
// ============================================================================
// Module: Capability Gate Registry Library
// Description: Cached capability registry, session context, and refresh.
// Purpose: Expose the runtime surface consumed by servers and tooling.
// Dependencies: capgate-config, capgate-core, jsonschema, reqwest, tokio
// ============================================================================

//! ## Overview
//! `capgate-registry` owns the mutable side of Capability Gate: the cached
//! catalog with its atomic rebuild-and-swap, the session's preset and
//! namespace selections, and credential introspection with dynamic refresh.
//! All policy decisions are delegated to the pure pipeline in
//! `capgate-core`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod docs;
pub mod introspection;
pub mod policy_inputs;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod session;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSeverity;
pub use audit::CatalogAuditSink;
pub use audit::CatalogFileAuditSink;
pub use audit::CatalogNoopAuditSink;
pub use audit::CatalogStderrAuditSink;
pub use audit::ExclusionAuditEvent;
pub use audit::ExecuteAuditEvent;
pub use audit::RebuildAuditEvent;
pub use audit::RebuildTrigger;
pub use audit::RefreshAuditEvent;
pub use audit::RefreshOutcome;
pub use audit::audit_sink_from_config;
pub use docs::CapabilityDoc;
pub use docs::GatedParameterDoc;
pub use docs::capability_docs;
pub use docs::capability_docs_markdown;
pub use introspection::CredentialInfo;
pub use introspection::CredentialIntrospector;
pub use introspection::CredentialSnapshot;
pub use introspection::HttpCredentialIntrospector;
pub use introspection::Identity;
pub use introspection::IntrospectionError;
pub use introspection::NoopCredentialIntrospector;
pub use policy_inputs::PolicyInputs;
pub use registry::CapabilitiesChanged;
pub use registry::CapabilityRegistry;
pub use registry::CatalogSnapshot;
pub use registry::RegistryError;
pub use report::IntrospectionReport;
pub use report::Notice;
pub use report::NoticeKind;
pub use report::NoticeLevel;
pub use report::ReportInputs;
pub use report::ReportThresholds;
pub use report::build_report;
pub use runtime::CapabilityRuntime;
pub use runtime::CredentialRefresh;
pub use runtime::RuntimeError;
pub use runtime::RuntimeSettings;
pub use session::SessionContext;
pub use session::SessionState;
pub use telemetry::CATALOG_LATENCY_BUCKETS_MS;
pub use telemetry::CatalogMetrics;
pub use telemetry::ExecutionMetricEvent;
pub use telemetry::ExecutionOutcome;
pub use telemetry::NoopCatalogMetrics;
pub use telemetry::RebuildMetricEvent;
